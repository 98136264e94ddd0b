//! Module providing JSON IO for reaction networks and trajectories
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder, ReactionBuilderError, ReactionKind};
use crate::timeseries::{Trajectory, TrajectoryError};

/// Subsystem prefix marking a transport reaction in models without an explicit flag
const TRANSPORT_SUBSYSTEM_PREFIX: &str = "Transport";

// region JSON Model
/// Represents a JSON serialized model, used for reading and writing models in json format
#[derive(Serialize, Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compartments: Option<IndexMap<String, String>>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compartment: Option<String>,
    #[serde(skip_serializing)]
    notes: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    #[serde(default)]
    lower_bound: Option<f64>,
    #[serde(default)]
    upper_bound: Option<f64>,
    #[serde(default)]
    reversible: Option<bool>,
    #[serde(default)]
    transport: Option<bool>,
    #[serde(default)]
    standard_gibbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subsystem: Option<String>,
}

impl JsonReaction {
    /// Explicit flag, else a flux range containing both signs
    fn is_reversible(&self) -> bool {
        self.reversible.unwrap_or(match (self.lower_bound, self.upper_bound) {
            (Some(lb), Some(ub)) => lb < 0. && ub > 0.,
            _ => false,
        })
    }

    fn kind(&self) -> ReactionKind {
        let tagged = self.transport.unwrap_or(false)
            || self
                .subsystem
                .as_deref()
                .is_some_and(|s| s.starts_with(TRANSPORT_SUBSYSTEM_PREFIX));
        if tagged {
            ReactionKind::Transport
        } else {
            ReactionKind::Internal
        }
    }
}
// endregion JSON Model

// region Conversions
impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
        }
    }
}

impl From<Metabolite> for JsonMetabolite {
    fn from(m: Metabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            notes: None,
        }
    }
}

impl From<&Reaction> for JsonReaction {
    fn from(r: &Reaction) -> Self {
        let lower_bound = if r.reversible { -1000. } else { 0. };
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            metabolites: r.metabolites.clone(),
            lower_bound: Some(lower_bound),
            upper_bound: Some(1000.),
            reversible: Some(r.reversible),
            transport: Some(r.is_transport()),
            standard_gibbs: r.standard_gibbs,
            subsystem: r.subsystem.clone(),
        }
    }
}

impl Model {
    /// Read a cobra style JSON model from a file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Model::from_json_str(&model_str)
    }

    /// Parse a cobra style JSON model
    ///
    /// Reversibility is read from a `reversible` field when present, otherwise a reaction
    /// is reversible when its bounds allow flux in both directions. Reactions with
    /// `"transport": true` or a subsystem starting with "Transport" are tagged as
    /// transport, and an optional `standard_gibbs` field holds the standard Gibbs energy.
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model = match serde_json::from_str::<JsonModel>(model_str) {
            Ok(model) => model,
            Err(err) => return Err(JsonError::UnableToParse(format!("{:?}", err))),
        };
        Model::from_json(json_model)
    }

    /// Write the model as cobra style JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let model_string = serde_json::to_string_pretty(&self.to_json())?;
        fs::write(path, model_string)?;
        Ok(())
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        model.id = json_model.id;
        model.compartments = json_model.compartments;
        json_model
            .metabolites
            .into_iter()
            .for_each(|m| model.add_metabolite(Metabolite::from(m)));
        for rxn in json_model.reactions {
            if model.reactions.contains_key(&rxn.id) {
                return Err(JsonError::DuplicateReaction(rxn.id));
            }
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .reversible(rxn.is_reversible())
                .kind(rxn.kind())
                .name(rxn.name)
                .standard_gibbs(rxn.standard_gibbs)
                .subsystem(rxn.subsystem)
                .metabolites(rxn.metabolites)
                .build()?;
            model.add_reaction(new_reaction);
        }
        Ok(model)
    }

    fn to_json(&self) -> JsonModel {
        JsonModel {
            metabolites: self
                .metabolites
                .values()
                .map(|m| m.clone().into())
                .collect(),
            reactions: self.reactions.values().map(JsonReaction::from).collect(),
            id: self.id.clone(),
            compartments: self.compartments.clone(),
        }
    }
}

impl Trajectory {
    /// Read a trajectory table from a JSON file, `null` marks a missing value
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Trajectory, JsonError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Trajectory::from_json_str(&data)
    }

    /// Parse a trajectory table and check its shape
    pub fn from_json_str(data: &str) -> Result<Trajectory, JsonError> {
        let trajectory: Trajectory = serde_json::from_str(data)
            .map_err(|err| JsonError::UnableToParse(format!("{:?}", err)))?;
        trajectory.validate()?;
        Ok(trajectory)
    }

    /// Write the trajectory table to a JSON file, missing values are written as `null`
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Reaction {0} is defined more than once")]
    DuplicateReaction(String),
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Trajectory is malformed")]
    MalformedTrajectory(#[from] TrajectoryError),
    #[error("Serde json parse error")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}

// endregion Conversions

#[cfg(test)]
mod json_tests {
    use super::*;

    #[test]
    fn json_reaction() {
        let data = r#"{
"id":"PFK",
"name":"Phosphofructokinase",
"metabolites":{
"adp_c":1.0,
"atp_c":-1.0,
"f6p_c":-1.0,
"fdp_c":1.0,
"h_c":1.0
},
"lower_bound":0.0,
"upper_bound":1000.0,
"gene_reaction_rule":"b3916 or b1723",
"subsystem":"Glycolysis/Gluconeogenesis",
"standard_gibbs":-14.2
}"#;
        let reaction: JsonReaction = serde_json::from_str(data).unwrap();
        assert_eq!(reaction.id, "PFK");
        assert!(!reaction.is_reversible());
        assert_eq!(reaction.kind(), ReactionKind::Internal);
        assert!((reaction.standard_gibbs.unwrap() + 14.2).abs() < 1e-25);
        assert!((reaction.metabolites["atp_c"] + 1.0).abs() < 1e-25);
    }

    #[test]
    fn reversibility_and_transport() {
        let from_bounds: JsonReaction = serde_json::from_str(
            r#"{"id":"R","metabolites":{"a":-1.0},"lower_bound":-10.0,"upper_bound":10.0}"#,
        )
        .unwrap();
        assert!(from_bounds.is_reversible());

        let explicit: JsonReaction = serde_json::from_str(
            r#"{"id":"R","metabolites":{"a":-1.0},"lower_bound":-10.0,"upper_bound":10.0,"reversible":false}"#,
        )
        .unwrap();
        assert!(!explicit.is_reversible());

        let unbounded: JsonReaction =
            serde_json::from_str(r#"{"id":"R","metabolites":{"a":-1.0}}"#).unwrap();
        assert!(!unbounded.is_reversible());

        let by_subsystem: JsonReaction = serde_json::from_str(
            r#"{"id":"T","metabolites":{"a":-1.0,"b":1.0},"subsystem":"Transport, Outer Membrane"}"#,
        )
        .unwrap();
        assert_eq!(by_subsystem.kind(), ReactionKind::Transport);

        let by_flag: JsonReaction = serde_json::from_str(
            r#"{"id":"T","metabolites":{"a":-1.0,"b":1.0},"transport":true}"#,
        )
        .unwrap();
        assert_eq!(by_flag.kind(), ReactionKind::Transport);
    }

    #[test]
    fn model_from_str() {
        let data = r#"{
"id":"toy",
"metabolites":[{"id":"A","compartment":"c"},{"id":"B","compartment":"c"}],
"reactions":[
{"id":"R1","metabolites":{"A":-1.0,"B":1.0},"lower_bound":-1000.0,"upper_bound":1000.0,"standard_gibbs":-3.0},
{"id":"R2","metabolites":{"B":-1.0},"lower_bound":0.0,"upper_bound":1000.0}
],
"genes":[]
}"#;
        let model = Model::from_json_str(data).unwrap();
        assert_eq!(model.id.as_deref(), Some("toy"));
        assert_eq!(model.num_metabolites(), 2);
        assert_eq!(model.num_reactions(), 2);
        let r1 = model.reactions.get("R1").unwrap();
        assert!(r1.reversible);
        assert_eq!(r1.standard_gibbs, Some(-3.0));
        assert!(!model.reactions["R2"].reversible);
        assert_eq!(
            model.metabolites["A"].compartment.as_deref(),
            Some("c")
        );
    }

    #[test]
    fn duplicate_reaction() {
        let data = r#"{"metabolites":[{"id":"A"}],"reactions":[
{"id":"R","metabolites":{"A":-1.0}},{"id":"R","metabolites":{"A":1.0}}]}"#;
        assert!(matches!(
            Model::from_json_str(data),
            Err(JsonError::DuplicateReaction(id)) if id == "R"
        ));
    }

    #[test]
    fn bad_input() {
        assert!(matches!(
            Model::from_json_str("not json"),
            Err(JsonError::UnableToParse(_))
        ));
        assert!(matches!(
            Model::read_json("/this/path/does/not/exist.json"),
            Err(JsonError::UnableToRead(_))
        ));
        assert!(matches!(
            Trajectory::from_json_str(r#"{"time":[0.0,1.0],"concentrations":{"A":[1.0]}}"#),
            Err(JsonError::MalformedTrajectory(_))
        ));
    }

    #[test]
    fn write_and_read_files() {
        let dir = tempfile::tempdir().unwrap();

        let model = Model::from_json_str(
            r#"{"metabolites":[{"id":"A"},{"id":"B"}],"reactions":[
{"id":"R1","metabolites":{"A":-1.0,"B":1.0},"reversible":true,"standard_gibbs":2.0},
{"id":"T1","metabolites":{"B":-1.0},"transport":true}]}"#,
        )
        .unwrap();
        let model_path = dir.path().join("model.json");
        model.write_json(&model_path).unwrap();
        assert_eq!(Model::read_json(&model_path).unwrap(), model);

        let mut table = Trajectory::new(vec![0., 0.5]).unwrap();
        table.insert_concentration("A", vec![f64::NAN, 2.]).unwrap();
        table.insert_flux("R1", vec![1., 1.]).unwrap();
        let table_path = dir.path().join("trajectory.json");
        table.write_json(&table_path).unwrap();
        let back = Trajectory::read_json(&table_path).unwrap();
        assert!(back.concentration("A", 0).is_nan());
        assert_eq!(back.concentration("A", 1), 2.);
        assert_eq!(back.fluxes, table.fluxes);
    }

    #[test]
    fn floats_are_read_back_exactly() {
        let values = vec![0.24511709462494194, 0.1 + 0.2, 1e-300, 2.2250738585072014e-308, -7.0 / 3.0];
        let mut table = Trajectory::new(vec![0., 0.1, 0.2, 0.3, 0.4]).unwrap();
        table.insert_concentration("A", values.clone()).unwrap();
        table.insert_flux("R1", values.iter().map(|v| v * 1e7).collect()).unwrap();

        let data = serde_json::to_string(&table).unwrap();
        let back = Trajectory::from_json_str(&data).unwrap();
        assert_eq!(back.time, table.time);
        assert_eq!(back.concentrations["A"], values);
        assert_eq!(back.fluxes, table.fluxes);
    }
}


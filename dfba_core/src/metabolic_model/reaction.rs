//! This module provides a struct for representing reactions
use crate::utils::hashing::hash_as_hex_string;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    ///
    /// Negative coefficients are reactants, positive coefficients are products
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Whether the reaction can carry flux in both directions
    #[builder(default = "false")]
    pub reversible: bool,
    /// What kind of process the reaction represents, see [`ReactionKind`]
    #[builder(default = "ReactionKind::Internal")]
    pub kind: ReactionKind,
    /// Standard Gibbs free energy change of the reaction (kJ/mol), if known
    #[builder(default = "None")]
    pub standard_gibbs: Option<f64>,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
}

impl Reaction {
    /// Determine the id to be associated with the forward half of a split reaction
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        format!("{}_forward", &self.id)
    }

    /// Determine the id to be associated with the reverse half of a split reaction
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hash_as_hex_string(&self.id))
    }

    /// Whether the reaction is tagged as a transport process
    pub fn is_transport(&self) -> bool {
        self.kind == ReactionKind::Transport
    }

    /// Whether the reaction is a synthetic system boundary
    pub fn is_boundary(&self) -> bool {
        self.kind == ReactionKind::Boundary
    }

    /// Iterator over (metabolite id, coefficient) for the consumed metabolites
    pub fn reactants(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.metabolites.iter().filter(|(_, coef)| **coef < 0.)
    }

    /// Iterator over (metabolite id, coefficient) for the produced metabolites
    pub fn products(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.metabolites.iter().filter(|(_, coef)| **coef > 0.)
    }

    /// Irreversible copy of this reaction under its forward id
    pub(crate) fn forward_half(&self) -> Reaction {
        Reaction {
            id: self.get_forward_id(),
            reversible: false,
            ..self.clone()
        }
    }

    /// Irreversible copy of this reaction with reactants and products swapped,
    /// under its reverse id.
    pub(crate) fn backward_half(&self) -> Reaction {
        Reaction {
            id: self.get_reverse_id(),
            metabolites: self
                .metabolites
                .iter()
                .map(|(met, coef)| (met.clone(), -coef))
                .collect(),
            name: self.name.as_ref().map(|n| format!("{} (reverse)", n)),
            reversible: false,
            kind: self.kind,
            standard_gibbs: self.standard_gibbs.map(|g| -g),
            subsystem: self.subsystem.clone(),
        }
    }
}

/// What kind of process a reaction represents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    /// Chemical transformation inside the network
    Internal,
    /// Moves a species between compartments without chemical transformation
    Transport,
    /// Synthetic exchange of a species with the environment
    Boundary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pgi() -> Reaction {
        let mut metabolites = IndexMap::new();
        metabolites.insert("g6p_c".to_string(), -1.0);
        metabolites.insert("f6p_c".to_string(), 1.0);
        ReactionBuilder::default()
            .id("PGI")
            .metabolites(metabolites)
            .reversible(true)
            .standard_gibbs(Some(2.5))
            .build()
            .unwrap()
    }

    #[test]
    fn split_ids() {
        let rxn = pgi();
        assert_eq!(rxn.get_forward_id(), "PGI_forward");
        assert!(rxn.get_reverse_id().starts_with("PGI_reverse_"));
        // Hash based suffix must be stable
        assert_eq!(rxn.get_reverse_id(), pgi().get_reverse_id());
    }

    #[test]
    fn backward_half_negates() {
        let rxn = pgi();
        let back = rxn.backward_half();
        assert!(!back.reversible);
        assert!((back.metabolites["g6p_c"] - 1.0).abs() < 1e-25);
        assert!((back.metabolites["f6p_c"] + 1.0).abs() < 1e-25);
        assert!((back.standard_gibbs.unwrap() + 2.5).abs() < 1e-25);
        let forward = rxn.forward_half();
        assert_eq!(forward.id, "PGI_forward");
        assert!(!forward.reversible);
    }

    #[test]
    fn reactants_and_products() {
        let rxn = pgi();
        let reactants: Vec<_> = rxn.reactants().map(|(id, _)| id.as_str()).collect();
        let products: Vec<_> = rxn.products().map(|(id, _)| id.as_str()).collect();
        assert_eq!(reactants, vec!["g6p_c"]);
        assert_eq!(products, vec!["f6p_c"]);
    }
}

//! Module providing time indexed tables of species concentrations and reaction fluxes

pub mod interpolate;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A time indexed table of concentrations and fluxes
///
/// Missing values are NaN. Every column holds exactly one value per time point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Strictly increasing time points
    pub time: Vec<f64>,
    /// Species id -> concentration at every time point
    #[serde(default, with = "nan_as_null")]
    pub concentrations: IndexMap<String, Vec<f64>>,
    /// Reaction id -> flux at every time point
    #[serde(default, with = "nan_as_null")]
    pub fluxes: IndexMap<String, Vec<f64>>,
}

impl Trajectory {
    /// Create an empty table over the given time points
    pub fn new(time: Vec<f64>) -> Result<Self, TrajectoryError> {
        let trajectory = Trajectory {
            time,
            concentrations: IndexMap::new(),
            fluxes: IndexMap::new(),
        };
        trajectory.validate()?;
        Ok(trajectory)
    }

    /// Number of time points
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Add (or replace) a concentration column
    pub fn insert_concentration(
        &mut self,
        id: &str,
        values: Vec<f64>,
    ) -> Result<(), TrajectoryError> {
        self.check_column(id, &values)?;
        self.concentrations.insert(id.to_string(), values);
        Ok(())
    }

    /// Add (or replace) a flux column
    pub fn insert_flux(&mut self, id: &str, values: Vec<f64>) -> Result<(), TrajectoryError> {
        self.check_column(id, &values)?;
        self.fluxes.insert(id.to_string(), values);
        Ok(())
    }

    /// Concentration of a species at a time index, NaN if unknown
    pub fn concentration(&self, id: &str, index: usize) -> f64 {
        Self::lookup(&self.concentrations, id, index)
    }

    /// Flux of a reaction at a time index, NaN if unknown
    pub fn flux(&self, id: &str, index: usize) -> f64 {
        Self::lookup(&self.fluxes, id, index)
    }

    fn lookup(columns: &IndexMap<String, Vec<f64>>, id: &str, index: usize) -> f64 {
        columns
            .get(id)
            .and_then(|col| col.get(index))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Check that time is strictly increasing and every column has one value per time point
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if let Some(position) = self
            .time
            .windows(2)
            .position(|w| !(w[1] > w[0]) || !w[0].is_finite() || !w[1].is_finite())
        {
            return Err(TrajectoryError::NonIncreasingTime(position + 1));
        }
        if self.time.len() == 1 && !self.time[0].is_finite() {
            return Err(TrajectoryError::NonIncreasingTime(0));
        }
        for (id, values) in self.concentrations.iter().chain(self.fluxes.iter()) {
            self.check_column(id, values)?;
        }
        Ok(())
    }

    fn check_column(&self, id: &str, values: &[f64]) -> Result<(), TrajectoryError> {
        if values.len() != self.time.len() {
            return Err(TrajectoryError::ColumnLength {
                id: id.to_string(),
                expected: self.time.len(),
                found: values.len(),
            });
        }
        Ok(())
    }
}

/// Errors associated with a malformed [`Trajectory`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// The time point at the held index is not larger than the one before it
    #[error("Time must be finite and strictly increasing, violated at index {0}")]
    NonIncreasingTime(usize),
    /// A column does not have one value per time point
    #[error("Column {id} has {found} values but there are {expected} time points")]
    ColumnLength {
        id: String,
        expected: usize,
        found: usize,
    },
}

/// Serialize NaN as null, and read null back as NaN
mod nan_as_null {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        columns: &IndexMap<String, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let converted: IndexMap<&str, Vec<Option<f64>>> = columns
            .iter()
            .map(|(id, values)| {
                (
                    id.as_str(),
                    values
                        .iter()
                        .map(|v| if v.is_finite() { Some(*v) } else { None })
                        .collect(),
                )
            })
            .collect();
        converted.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, Vec<f64>>, D::Error> {
        let raw = IndexMap::<String, Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(id, values)| {
                (
                    id,
                    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                )
            })
            .collect())
    }
}

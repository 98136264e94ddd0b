//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A continuous decision variable
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Identifier, unique within a problem
    #[builder(setter(into))]
    pub id: String,
    /// Lowest value the variable can take
    #[builder(default = "f64::NEG_INFINITY")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
    /// Position of the variable in the problem, set when it is added
    #[builder(default = "0")]
    pub index: usize,
}

impl Variable {
    /// Whether the bounds describe a non-empty interval
    pub fn has_valid_bounds(&self) -> bool {
        !self.lower_bound.is_nan() && !self.upper_bound.is_nan() && self.lower_bound <= self.upper_bound
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <= {} <= {}", self.lower_bound, self.id, self.upper_bound)
    }
}

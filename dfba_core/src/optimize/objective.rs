//! Provides struct for representing an optimization problem's objective

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Constant offset, not seen by the solver but added to the reported objective value
    constant: f64,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            constant: 0.,
            sense,
        }
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a new Linear term to the objective
    pub fn add_linear_term(&mut self, var: usize, coef: f64) {
        self.terms.push(ObjectiveTerm::Linear { var, coef });
    }

    /// Add a new Quadratic term `coef * var1 * var2` to the objective
    pub fn add_quadratic_term(&mut self, var1: usize, var2: usize, coef: f64) {
        self.terms.push(ObjectiveTerm::Quadratic { var1, var2, coef });
    }

    /// Add to the constant offset
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn contains_quadratic(&self) -> bool {
        self.terms
            .iter()
            .any(|t| matches!(t, ObjectiveTerm::Quadratic { .. }))
    }

    /// Value of the objective at a point, including the constant offset
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|term| match *term {
                ObjectiveTerm::Linear { var, coef } => coef * values[var],
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    coef * values[var1] * values[var2]
                }
            })
            .sum::<f64>()
            + self.constant
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    #[default]
    Minimize,
    /// The objective should be maximized
    Maximize,
}

// region Objective Terms
/// A term in the objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveTerm {
    /// A quadratic term `coef * var1 * var2`
    Quadratic {
        /// First variable in the objective term
        var1: usize,
        /// Second variable in the objective term
        var2: usize,
        /// Coefficient for quadratic term
        coef: f64,
    },
    /// A linear term in the objective
    Linear {
        /// Variable in objective term
        var: usize,
        /// Coefficient for linear term
        coef: f64,
    },
}

impl ObjectiveTerm {
    /// Indices of the variables in the term
    pub fn variables(&self) -> Vec<usize> {
        match *self {
            ObjectiveTerm::Quadratic { var1, var2, .. } => vec![var1, var2],
            ObjectiveTerm::Linear { var, .. } => vec![var],
        }
    }
}

// endregion Objective Terms

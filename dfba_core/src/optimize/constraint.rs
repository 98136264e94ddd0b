//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, an infinite bound leaves that side open
    Inequality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `variables`: Indices of the variables
    /// - `coefficients`: A slice of coefficients for the variables
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use dfba_core::optimize::constraint::Constraint;
    /// // Create a constraint representing 3*x0 + 2*x1 = 6
    /// let new_constraint = Constraint::new_equality(&[0, 1], &[3.0, 2.0], 6.);
    /// assert_eq!(format!("{}", new_constraint), "3*x0 + 2*x1 = 6");
    /// ```
    pub fn new_equality(variables: &[usize], coefficients: &[f64], equals: f64) -> Self {
        Constraint::Equality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Create a new inequality constraint `lower_bound <= terms <= upper_bound`
    pub fn new_inequality(
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    pub fn terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Indices of the variables in the constraint
    pub fn variables(&self) -> Vec<usize> {
        self.terms().iter().map(|t| t.variable).collect()
    }

    /// Coefficients of the variables in the constraint
    pub fn coefficients(&self) -> Vec<f64> {
        self.terms().iter().map(|t| t.coefficient).collect()
    }

    fn zip_into_terms(variables: &[usize], coefficients: &[f64]) -> Vec<ConstraintTerm> {
        variables
            .iter()
            .zip(coefficients)
            .map(|(var, coef)| ConstraintTerm {
                variable: *var,
                coefficient: *coef,
            })
            .collect()
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals } => {
                write!(f, "{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{} <= {} <= {}",
                lower_bound,
                Self::terms_to_string(terms),
                upper_bound
            ),
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Index of the variable
    pub variable: usize,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*x{}", self.coefficient, self.variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inequality_display() {
        let cons = Constraint::new_inequality(&[2, 0], &[1.5, -1.], f64::NEG_INFINITY, 4.);
        assert_eq!(format!("{}", cons), "-inf <= 1.5*x2 + -1*x0 <= 4");
        assert_eq!(cons.variables(), vec![2, 0]);
        assert_eq!(cons.coefficients(), vec![1.5, -1.]);
    }
}

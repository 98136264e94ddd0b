//! Module for constructing and solving the optimization problem posed at every time step

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

/// Outcome of handing a problem to a [`solvers::Solver`]
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSolution {
    pub status: OptimizationStatus,
    /// Objective value at the returned point, None when no point was returned
    pub objective_value: Option<f64>,
    /// Variable values ordered by variable index, None when no point was returned
    pub variable_values: Option<Vec<f64>>,
}

impl ProblemSolution {
    /// Solution of a problem that could not be solved
    pub fn failed(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
        }
    }

    /// Whether the returned point can be used, an almost optimal point counts
    pub fn is_usable(&self) -> bool {
        matches!(
            self.status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) && self.variable_values.is_some()
    }
}

/// Termination status reported by a solver
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// No solve attempted, or the solver rejected the problem
    Unoptimized,
    Optimal,
    Unbounded,
    /// No point satisfies every constraint
    Infeasible,
    /// Solved to reduced accuracy
    AlmostOptimal,
    NumericalError,
    /// Stopped on an iteration or time limit, or for lack of progress
    SolverHalted,
}

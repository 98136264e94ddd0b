//! Solvers wrapping the Clarabel backend to observe or disturb the optimization loop

use dfba_core::optimize::objective::ObjectiveSense;
use dfba_core::optimize::solvers::clarabel::ClarabelSolver;
use dfba_core::optimize::solvers::{Solver, SolverError};
use dfba_core::optimize::{OptimizationStatus, ProblemSolution};

/// Reports the solve call with the given index as infeasible, delegates everything else
pub struct FlakySolver {
    inner: ClarabelSolver,
    failing_call: usize,
    calls: usize,
}

impl FlakySolver {
    pub fn new(failing_call: usize) -> Self {
        FlakySolver {
            inner: ClarabelSolver::default(),
            failing_call,
            calls: 0,
        }
    }
}

/// Counts resets and the variables declared since the last one
#[derive(Default)]
pub struct RecordingSolver {
    inner: ClarabelSolver,
    pub resets: usize,
    pub variables_since_reset: usize,
    /// Variables declared when each solve was called
    pub variables_at_solve: Vec<usize>,
}

macro_rules! delegate_building {
    () => {
        fn add_equality_constraint(
            &mut self,
            variables: &[usize],
            coefficients: &[f64],
            equals: f64,
        ) -> Result<(), SolverError> {
            self.inner
                .add_equality_constraint(variables, coefficients, equals)
        }

        fn add_inequality_constraint(
            &mut self,
            variables: &[usize],
            coefficients: &[f64],
            lower_bound: f64,
            upper_bound: f64,
        ) -> Result<(), SolverError> {
            self.inner
                .add_inequality_constraint(variables, coefficients, lower_bound, upper_bound)
        }

        fn add_linear_objective_term(
            &mut self,
            variable: usize,
            coefficient: f64,
        ) -> Result<(), SolverError> {
            self.inner.add_linear_objective_term(variable, coefficient)
        }

        fn add_quadratic_objective_term(
            &mut self,
            variable1: usize,
            variable2: usize,
            coefficient: f64,
        ) -> Result<(), SolverError> {
            self.inner
                .add_quadratic_objective_term(variable1, variable2, coefficient)
        }

        fn set_objective_sense(
            &mut self,
            objective_sense: ObjectiveSense,
        ) -> Result<(), SolverError> {
            self.inner.set_objective_sense(objective_sense)
        }
    };
}

impl Solver for FlakySolver {
    fn add_continuous_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, SolverError> {
        self.inner.add_continuous_variable(lower_bound, upper_bound)
    }

    delegate_building!();

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let call = self.calls;
        self.calls += 1;
        if call == self.failing_call {
            return Ok(ProblemSolution::failed(OptimizationStatus::Infeasible));
        }
        self.inner.solve()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

impl Solver for RecordingSolver {
    fn add_continuous_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, SolverError> {
        self.variables_since_reset += 1;
        self.inner.add_continuous_variable(lower_bound, upper_bound)
    }

    delegate_building!();

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        self.variables_at_solve.push(self.variables_since_reset);
        self.inner.solve()
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.variables_since_reset = 0;
        self.inner.reset();
    }
}

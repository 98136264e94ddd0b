//! Solver interface for OSQP solver
use std::borrow::Cow;

use log::debug;
use osqp::{CscMatrix, Problem, Settings, Status};

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{QuadraticProgram, Row, Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Quadratic program solver backed by the OSQP operator splitting method
#[derive(Clone, Debug)]
pub struct OsqpSolver {
    program: QuadraticProgram,
    max_iterations: u32,
}

impl OsqpSolver {
    pub fn new(max_iterations: u32) -> Self {
        OsqpSolver {
            program: QuadraticProgram::default(),
            max_iterations,
        }
    }
}

fn to_osqp(matrix: nalgebra_sparse::CscMatrix<f64>) -> CscMatrix<'static> {
    let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
    let (indptr, indices, data) = matrix.disassemble();
    CscMatrix {
        nrows,
        ncols,
        indptr: Cow::Owned(indptr),
        indices: Cow::Owned(indices),
        data: Cow::Owned(data),
    }
}

impl Solver for OsqpSolver {
    fn add_continuous_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, SolverError> {
        Ok(self.program.add_variable(lower_bound, upper_bound))
    }

    fn add_equality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError> {
        self.program.add_equality(variables, coefficients, equals)
    }

    fn add_inequality_constraint(
        &mut self,
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_inequality(variables, coefficients, lower_bound, upper_bound)
    }

    fn add_linear_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.program.add_linear(variable, coefficient)
    }

    fn add_quadratic_objective_term(
        &mut self,
        variable1: usize,
        variable2: usize,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.program.add_quadratic(variable1, variable2, coefficient)
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError> {
        self.program.sense = objective_sense;
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let program = &self.program;
        // OSQP form: l <= Ax <= u, one row per constraint and per bounded variable
        let bound_rows = program.bound_rows();
        let rows: Vec<(&Row, f64)> = program
            .equalities
            .iter()
            .chain(program.inequalities.iter())
            .chain(bound_rows.iter())
            .map(|row| (row, 1.))
            .collect();
        let lower: Vec<f64> = rows.iter().map(|(row, _)| row.lower).collect();
        let upper: Vec<f64> = rows.iter().map(|(row, _)| row.upper).collect();

        let p = to_osqp(program.quadratic_matrix());
        let q = program.linear_vector();
        let a = to_osqp(program.row_matrix(&rows));
        let settings = Settings::default()
            .verbose(false)
            .max_iter(self.max_iterations);
        let mut problem = Problem::new(p, &q, a, &lower, &upper, &settings)
            .map_err(|err| SolverError::Setup(format!("{:?}", err)))?;

        let sign = program.sense_sign();
        let solution = match problem.solve() {
            Status::Solved(solution) => ProblemSolution {
                status: OptimizationStatus::Optimal,
                objective_value: Some(sign * solution.obj_val()),
                variable_values: Some(solution.x().to_vec()),
            },
            Status::SolvedInaccurate(solution) => ProblemSolution {
                status: OptimizationStatus::AlmostOptimal,
                objective_value: Some(sign * solution.obj_val()),
                variable_values: Some(solution.x().to_vec()),
            },
            Status::PrimalInfeasible(_) | Status::PrimalInfeasibleInaccurate(_) => {
                ProblemSolution::failed(OptimizationStatus::Infeasible)
            }
            Status::DualInfeasible(_) | Status::DualInfeasibleInaccurate(_) => {
                ProblemSolution::failed(OptimizationStatus::Unbounded)
            }
            Status::MaxIterationsReached(_) | Status::TimeLimitReached(_) => {
                ProblemSolution::failed(OptimizationStatus::SolverHalted)
            }
            Status::NonConvex(_) => ProblemSolution::failed(OptimizationStatus::NumericalError),
            _ => ProblemSolution::failed(OptimizationStatus::Unoptimized),
        };
        debug!("OSQP finished with status {:?}", solution.status);
        Ok(solution)
    }

    fn reset(&mut self) {
        self.program.clear();
    }
}

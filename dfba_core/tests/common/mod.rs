//! Shared fixtures for the integration tests
#![allow(dead_code)]

pub mod mock_solvers;
pub mod networks;

pub use mock_solvers::{FlakySolver, RecordingSolver};
pub use networks::{chain_measurements, chain_model, test_data};

/// Equality treating two NaN as equal
pub fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

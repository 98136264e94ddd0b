//! Module computing the steady state flux space of an augmented reaction network
//!
//! The basis is computed once per network and shared by every time step of the dynamic
//! optimization.

pub mod tableau;

use log::debug;
use nalgebra::{DMatrix, DVector, RowDVector};

use crate::configuration::Configuration;
use crate::network::transform::ReverseIndexMap;
use crate::steady_state::tableau::{eliminate_zero_rows, participation_order, tableau_null_space};

/// Computes the steady state basis of a stoichiometric matrix
#[derive(Clone, Debug, PartialEq)]
pub struct SteadyStateSolver {
    /// Process species with few participating reactions first
    pub reorder_rows: bool,
    /// Magnitude at or below which an elimination entry counts as zero
    pub pivot_tolerance: f64,
    /// Magnitude below which a representative flux is snapped to zero
    pub zero_tolerance: f64,
}

impl Default for SteadyStateSolver {
    fn default() -> Self {
        SteadyStateSolver {
            reorder_rows: true,
            pivot_tolerance: 1e-10,
            zero_tolerance: 1e-15,
        }
    }
}

impl SteadyStateSolver {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        SteadyStateSolver {
            reorder_rows: configuration.reorder_rows,
            pivot_tolerance: configuration.pivot_tolerance,
            zero_tolerance: configuration.zero_tolerance,
        }
    }

    /// Compute the steady state basis of `matrix`
    ///
    /// Rows of the returned basis whose only nonzero entries are a split reaction and its
    /// own reverse are dropped. A matrix with full column rank gives an empty basis and a
    /// zero representative flux.
    pub fn solve(&self, matrix: &DMatrix<f64>, reverse_index_map: &ReverseIndexMap) -> SteadyStateBasis {
        let (reduced, kept_rows) = eliminate_zero_rows(matrix);
        if reduced.nrows() < matrix.nrows() {
            debug!(
                "Dropped {} species that take part in no reaction",
                matrix.nrows() - reduced.nrows()
            );
        }
        let (ordered, row_map) = if self.reorder_rows {
            let order = participation_order(&reduced);
            let row_map = order.iter().map(|r| kept_rows[*r]).collect();
            (reduced.select_rows(order.iter()), row_map)
        } else {
            (reduced, kept_rows)
        };

        let pairs: Vec<(usize, usize)> = reverse_index_map.pairs().collect();
        let null_space = tableau_null_space(&ordered, &pairs, self.pivot_tolerance);
        let retained: Vec<usize> = null_space
            .row_iter()
            .enumerate()
            .filter(|(_, row)| !is_reverse_tautology(row.iter().copied(), reverse_index_map))
            .map(|(i, _)| i)
            .collect();
        let removed_degenerate = null_space.nrows() - retained.len();
        if removed_degenerate > 0 {
            debug!(
                "Removed {} basis vectors relating a reaction only to its own reverse",
                removed_degenerate
            );
        }
        let basis = null_space.select_rows(retained.iter());
        if basis.nrows() == 0 {
            debug!("Network has no steady state degree of freedom");
        }
        let representative_flux = column_sums(&basis, |_| true, self.zero_tolerance);

        SteadyStateBasis {
            basis,
            reduced_matrix: ordered,
            row_map,
            representative_flux,
            removed_degenerate,
            zero_tolerance: self.zero_tolerance,
        }
    }
}

/// Steady state basis of an augmented network
#[derive(Clone, Debug, PartialEq)]
pub struct SteadyStateBasis {
    /// One basis vector per row, one column per augmented reaction
    pub basis: DMatrix<f64>,
    /// Stoichiometric matrix without zero rows, in processing order
    pub reduced_matrix: DMatrix<f64>,
    /// Index in the full stoichiometric matrix of every row of `reduced_matrix`
    pub row_map: Vec<usize>,
    /// Sum of the basis vectors, with round-off snapped to zero
    pub representative_flux: DVector<f64>,
    /// Number of basis vectors removed as reverse tautologies
    pub removed_degenerate: usize,
    zero_tolerance: f64,
}

impl SteadyStateBasis {
    /// Number of basis vectors
    pub fn num_vectors(&self) -> usize {
        self.basis.nrows()
    }

    pub fn num_reactions(&self) -> usize {
        self.basis.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.basis.nrows() == 0
    }

    /// Basis vector `k`
    pub fn vector(&self, k: usize) -> RowDVector<f64> {
        self.basis.row(k).into_owned()
    }

    /// Coefficient of reaction `reaction` in basis vector `k`
    pub fn coefficient(&self, k: usize, reaction: usize) -> f64 {
        self.basis[(k, reaction)]
    }

    /// Sum of absolute coefficients of basis vector `k`
    pub fn l1_norm(&self, k: usize) -> f64 {
        self.basis.row(k).iter().map(|v| v.abs()).sum()
    }

    /// Whether any basis vector involves the reaction
    pub fn carries_flux(&self, reaction: usize) -> bool {
        self.basis.column(reaction).iter().any(|v| *v != 0.)
    }

    /// Reaction fluxes of the linear combination of basis vectors with `coefficients`
    pub fn flux(&self, coefficients: &[f64]) -> DVector<f64> {
        let mut flux = DVector::zeros(self.num_reactions());
        for (k, c) in coefficients.iter().enumerate().take(self.num_vectors()) {
            flux.axpy(*c, &self.basis.row(k).transpose(), 1.);
        }
        flux.iter_mut().for_each(|v| {
            if v.abs() < self.zero_tolerance {
                *v = 0.
            }
        });
        flux
    }

    /// Representative flux computed without the basis vectors that involve an excluded
    /// reaction
    ///
    /// Used for reactions whose flux is fixed from outside (target fluxes). With a
    /// predicate that excludes nothing this equals `representative_flux`.
    pub fn representative_flux_excluding<F>(&self, excluded: F) -> DVector<f64>
    where
        F: Fn(usize) -> bool,
    {
        let basis = &self.basis;
        column_sums(
            basis,
            |k| {
                !basis
                    .row(k)
                    .iter()
                    .enumerate()
                    .any(|(j, v)| *v != 0. && excluded(j))
            },
            self.zero_tolerance,
        )
    }

    /// `reduced_matrix * basisᵀ`, zero up to round-off for a correct basis
    pub fn residual(&self) -> DMatrix<f64> {
        &self.reduced_matrix * self.basis.transpose()
    }
}

/// Whether a basis vector has exactly two nonzero entries which are the halves of one
/// split reaction
fn is_reverse_tautology(
    values: impl Iterator<Item = f64>,
    reverse_index_map: &ReverseIndexMap,
) -> bool {
    let nonzero: Vec<usize> = values
        .enumerate()
        .filter(|(_, v)| *v != 0.)
        .map(|(j, _)| j)
        .collect();
    nonzero.len() == 2 && reverse_index_map.are_partners(nonzero[0], nonzero[1])
}

/// Per column sum over the basis rows accepted by `include_row`
fn column_sums<F>(basis: &DMatrix<f64>, include_row: F, zero_tolerance: f64) -> DVector<f64>
where
    F: Fn(usize) -> bool,
{
    let mut sums = DVector::<f64>::zeros(basis.ncols());
    for (k, row) in basis.row_iter().enumerate() {
        if !include_row(k) {
            continue;
        }
        for (j, v) in row.iter().enumerate() {
            sums[j] += v;
        }
    }
    sums.iter_mut().for_each(|v| {
        if v.abs() < zero_tolerance {
            *v = 0.
        }
    });
    sums
}

//! Null space computation by elimination on the tableau `[Nᵀ | I]`
//!
//! Each species row of the stoichiometric matrix becomes a tableau column. Eliminating those
//! columns one after the other leaves, in the identity half, one row per degree of freedom
//! whose left half is zero: these rows span the null space of the matrix. Species with few
//! participating reactions are eliminated first, which keeps fill-in low on networks with
//! highly connected cofactors.
//!
//! Columns that are exact negatives of each other (the halves of a split reversible
//! reaction) are combined before elimination, so their sum appears as a basis vector of
//! its own in every processing order.
use std::cmp::Ordering;

use nalgebra::DMatrix;

/// Remove every all-zero row of a matrix
///
/// # Returns
/// The reduced matrix and, for every reduced row, the index of the row it came from
pub fn eliminate_zero_rows(matrix: &DMatrix<f64>) -> (DMatrix<f64>, Vec<usize>) {
    let kept: Vec<usize> = matrix
        .row_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|v| *v != 0.))
        .map(|(i, _)| i)
        .collect();
    (matrix.select_rows(kept.iter()), kept)
}

/// Number of nonzero entries in every row
pub fn participation_counts(matrix: &DMatrix<f64>) -> Vec<usize> {
    matrix
        .row_iter()
        .map(|row| row.iter().filter(|v| **v != 0.).count())
        .collect()
}

/// Row order by ascending participation count, ties keep their original order
pub fn participation_order(matrix: &DMatrix<f64>) -> Vec<usize> {
    let counts = participation_counts(matrix);
    let mut order: Vec<usize> = (0..matrix.nrows()).collect();
    // sort_by_key is stable
    order.sort_by_key(|row| counts[*row]);
    order
}

/// Basis of the null space of `matrix`, one basis vector per row of the result
///
/// `paired_columns` lists (forward, backward) column pairs with opposite coefficients.
/// Pivots are chosen by largest magnitude among the rows not yet used as a pivot (first
/// such row on ties) and entries with magnitude at or below `pivot_tolerance` are treated
/// as zero, so the number of returned rows is `ncols - rank`.
pub fn tableau_null_space(
    matrix: &DMatrix<f64>,
    paired_columns: &[(usize, usize)],
    pivot_tolerance: f64,
) -> DMatrix<f64> {
    let num_species = matrix.nrows();
    let num_reactions = matrix.ncols();
    let mut left = matrix.transpose();
    let mut right = DMatrix::<f64>::identity(num_reactions, num_reactions);
    let mut active: Vec<usize> = (0..num_reactions).collect();

    for &(forward, backward) in paired_columns {
        for c in 0..num_species {
            let value = left[(forward, c)];
            left[(backward, c)] += value;
        }
        right[(backward, forward)] += 1.;
    }

    for col in 0..num_species {
        let Some(position) = select_pivot(&left, &active, col, pivot_tolerance) else {
            continue;
        };
        let pivot_row = active.remove(position);
        let pivot_value = left[(pivot_row, col)];
        for &row in &active {
            let factor = left[(row, col)] / pivot_value;
            if factor == 0. {
                continue;
            }
            for c in col..num_species {
                let delta = factor * left[(pivot_row, c)];
                left[(row, c)] -= delta;
            }
            for c in 0..num_reactions {
                let delta = factor * right[(pivot_row, c)];
                right[(row, c)] -= delta;
            }
            left[(row, col)] = 0.;
        }
    }

    let mut basis = right.select_rows(active.iter());
    basis.iter_mut().for_each(|v| {
        if v.abs() <= pivot_tolerance {
            *v = 0.
        }
    });
    for mut row in basis.row_iter_mut() {
        let values: Vec<f64> = row.iter().copied().collect();
        if orientation(&values) == Ordering::Less {
            row.neg_mut();
        }
    }
    basis
}

/// Position in `active` of the pivot for `col`
fn select_pivot(
    left: &DMatrix<f64>,
    active: &[usize],
    col: usize,
    pivot_tolerance: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, &row) in active.iter().enumerate() {
        let magnitude = left[(row, col)].abs();
        if magnitude <= pivot_tolerance {
            continue;
        }
        match best {
            Some((_, best_magnitude)) if magnitude <= best_magnitude => {}
            _ => best = Some((position, magnitude)),
        }
    }
    best.map(|(position, _)| position)
}

/// Sign of a basis vector: the sign of its entry sum, or of its first nonzero entry when
/// the sum vanishes
fn orientation(values: &[f64]) -> Ordering {
    let sum: f64 = values.iter().sum();
    if sum > 0. {
        return Ordering::Greater;
    }
    if sum < 0. {
        return Ordering::Less;
    }
    values
        .iter()
        .find(|v| **v != 0.)
        .map(|v| if *v < 0. { Ordering::Less } else { Ordering::Greater })
        .unwrap_or(Ordering::Equal)
}

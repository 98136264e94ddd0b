//! Interpolation of sparse measurements onto a dense, segment-wise uniform time grid
use indexmap::IndexMap;
use log::{debug, warn};

use crate::timeseries::Trajectory;

/// Interpolate every column of a table onto a denser time grid
///
/// The same number of points is inserted, uniformly spaced, between every pair of
/// consecutive time points, chosen so that the total is as close as possible to
/// `target_points`. Each quantity is interpolated with a natural cubic spline through its
/// measured (non-NaN) values; outside its measured range the nearest measured value is
/// held. Quantities without any measurement stay NaN on the whole grid. Original values
/// are reproduced exactly at the original time points.
///
/// A `target_points` smaller than the number of time points is a caller error: it is
/// logged and the input is returned unchanged.
pub fn interpolate(trajectory: &Trajectory, target_points: usize) -> Trajectory {
    let n = trajectory.len();
    if target_points < n {
        warn!(
            "Requested {} interpolation points for a table with {} time points, keeping the input",
            target_points, n
        );
        return trajectory.clone();
    }
    if target_points == n || n < 2 {
        return trajectory.clone();
    }
    let inserted = points_per_segment(n, target_points);
    if inserted == 0 {
        return trajectory.clone();
    }
    let time = dense_grid(&trajectory.time, inserted);
    debug!(
        "Interpolating {} time points onto {} ({} inserted per segment)",
        n,
        time.len(),
        inserted
    );

    Trajectory {
        concentrations: interpolate_columns(
            &trajectory.time,
            &trajectory.concentrations,
            &time,
            inserted,
        ),
        fluxes: interpolate_columns(&trajectory.time, &trajectory.fluxes, &time, inserted),
        time,
    }
}

/// Number of points inserted between consecutive time points
fn points_per_segment(num_points: usize, target_points: usize) -> usize {
    let extra = (target_points - num_points) as f64;
    (extra / (num_points - 1) as f64).round() as usize
}

/// Grid with `inserted` uniformly spaced points between every pair of time points
fn dense_grid(time: &[f64], inserted: usize) -> Vec<f64> {
    let steps = (inserted + 1) as f64;
    let mut grid = Vec::with_capacity(time.len() + inserted * (time.len() - 1));
    for pair in time.windows(2) {
        grid.push(pair[0]);
        for k in 1..=inserted {
            grid.push(pair[0] + (pair[1] - pair[0]) * k as f64 / steps);
        }
    }
    if let Some(last) = time.last() {
        grid.push(*last);
    }
    grid
}

fn interpolate_columns(
    time: &[f64],
    columns: &IndexMap<String, Vec<f64>>,
    grid: &[f64],
    inserted: usize,
) -> IndexMap<String, Vec<f64>> {
    columns
        .iter()
        .map(|(id, values)| {
            let (x, y): (Vec<f64>, Vec<f64>) = time
                .iter()
                .zip(values)
                .filter(|(_, v)| !v.is_nan())
                .map(|(t, v)| (*t, *v))
                .unzip();
            let mut dense = match NaturalCubicSpline::fit(x, y) {
                Some(spline) => grid.iter().map(|t| spline.evaluate(*t)).collect(),
                None => vec![f64::NAN; grid.len()],
            };
            for (i, v) in values.iter().enumerate() {
                if !v.is_nan() {
                    dense[i * (inserted + 1)] = *v;
                }
            }
            (id.clone(), dense)
        })
        .collect()
}

/// Cubic spline with zero second derivative at both ends
#[derive(Clone, Debug, PartialEq)]
pub struct NaturalCubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at every knot
    second_derivatives: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit a spline through the points, None if there are no points
    ///
    /// `x` must be strictly increasing. A single point gives a constant, two points a line.
    pub fn fit(x: Vec<f64>, y: Vec<f64>) -> Option<Self> {
        if x.is_empty() || x.len() != y.len() {
            return None;
        }
        let k = x.len();
        let mut second_derivatives = vec![0.; k];
        if k > 2 {
            // Thomas algorithm on the interior knots
            let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
            let interior = k - 2;
            let mut diagonal = vec![0.; interior];
            let mut rhs = vec![0.; interior];
            for i in 0..interior {
                diagonal[i] = 2. * (h[i] + h[i + 1]);
                rhs[i] = 6. * ((y[i + 2] - y[i + 1]) / h[i + 1] - (y[i + 1] - y[i]) / h[i]);
            }
            for i in 1..interior {
                let factor = h[i] / diagonal[i - 1];
                diagonal[i] -= factor * h[i];
                rhs[i] -= factor * rhs[i - 1];
            }
            second_derivatives[interior] = rhs[interior - 1] / diagonal[interior - 1];
            for i in (0..interior - 1).rev() {
                second_derivatives[i + 1] =
                    (rhs[i] - h[i + 1] * second_derivatives[i + 2]) / diagonal[i];
            }
        }
        Some(NaturalCubicSpline {
            x,
            y,
            second_derivatives,
        })
    }

    /// Value of the spline, held constant outside the knot range
    pub fn evaluate(&self, t: f64) -> f64 {
        let last = self.x.len() - 1;
        if t <= self.x[0] {
            return self.y[0];
        }
        if t >= self.x[last] {
            return self.y[last];
        }
        // first knot strictly greater than t, at least 1 and at most last
        let j = self.x.partition_point(|x| *x <= t) - 1;
        let (x0, x1) = (self.x[j], self.x[j + 1]);
        let (y0, y1) = (self.y[j], self.y[j + 1]);
        let (m0, m1) = (self.second_derivatives[j], self.second_derivatives[j + 1]);
        let h = x1 - x0;
        let a = x1 - t;
        let b = t - x0;
        m0 * a.powi(3) / (6. * h)
            + m1 * b.powi(3) / (6. * h)
            + (y0 / h - m0 * h / 6.) * a
            + (y1 / h - m1 * h / 6.) * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_point_series() -> Trajectory {
        let mut table = Trajectory::new(vec![0., 10., 20.]).unwrap();
        table.insert_concentration("A", vec![1., 3., 2.]).unwrap();
        table
    }

    #[test]
    fn three_points_to_twenty_one() {
        let dense = interpolate(&three_point_series(), 21);
        assert_eq!(dense.len(), 21);
        for (i, t) in dense.time.iter().enumerate() {
            assert_relative_eq!(*t, i as f64, epsilon = 1e-12);
        }
        let a = &dense.concentrations["A"];
        assert_eq!(a[0], 1.);
        assert_eq!(a[10], 3.);
        assert_eq!(a[20], 2.);
        assert!(a.iter().all(|v| v.is_finite()));
        // Smooth overshoot of the peak between the knots
        assert!(a[9] > 2.5 && a[11] > 2.5);
    }

    #[test]
    fn equal_target_is_identity() {
        let table = three_point_series();
        assert_eq!(interpolate(&table, 3), table);
    }

    #[test]
    fn smaller_target_keeps_input() {
        let table = three_point_series();
        assert_eq!(interpolate(&table, 2), table);
    }

    #[test]
    fn points_per_segment_rounds() {
        assert_eq!(points_per_segment(3, 21), 9);
        assert_eq!(points_per_segment(4, 10), 2);
        assert_eq!(points_per_segment(4, 5), 0);
        assert_eq!(points_per_segment(3, 6), 2);
    }

    #[test]
    fn gaps_and_missing_quantities() {
        let mut table = Trajectory::new(vec![0., 1., 2., 3.]).unwrap();
        table
            .insert_concentration("A", vec![f64::NAN, 2., f64::NAN, 4.])
            .unwrap();
        table.insert_concentration("B", vec![f64::NAN; 4]).unwrap();
        table.insert_flux("R", vec![f64::NAN, 5., f64::NAN, f64::NAN]).unwrap();
        let dense = interpolate(&table, 7);
        assert_eq!(dense.len(), 7);

        let a = &dense.concentrations["A"];
        // held before the first measurement, linear between two measurements
        assert_eq!(a[0], 2.);
        assert_eq!(a[1], 2.);
        assert_relative_eq!(a[4], 3., epsilon = 1e-12);
        assert_eq!(a[6], 4.);
        assert!(dense.concentrations["B"].iter().all(|v| v.is_nan()));
        assert!(dense.fluxes["R"].iter().all(|v| *v == 5.));
    }

    #[test]
    fn spline_reproduces_a_line() {
        let spline = NaturalCubicSpline::fit(vec![0., 1., 3., 4.], vec![1., 3., 7., 9.]).unwrap();
        for t in [0.5, 2., 3.5] {
            assert_relative_eq!(spline.evaluate(t), 1. + 2. * t, epsilon = 1e-12);
        }
        assert!(NaturalCubicSpline::fit(vec![], vec![]).is_none());
    }
}

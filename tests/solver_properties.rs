//! Property-based tests for ordering, factorization and substitution.
//!
//! Systems are generated as diagonally dominant matrices with their rows
//! shuffled, so that they are well conditioned but usually have zeros on
//! the diagonal and need off-diagonal pivots.

use proptest::prelude::*;
use sparse_mna::{MatrixLocation, RealSolver};

// ============================================================================
// Generators
// ============================================================================

#[derive(Debug, Clone)]
struct System {
    size: usize,
    /// Dense copy, 0-based
    dense: Vec<Vec<f64>>,
    rhs: Vec<f64>,
}

impl System {
    fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.dense.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0.0)
                .map(move |(c, &v)| (r + 1, c + 1, v))
        })
    }

    fn stamp(&self, solver: &mut RealSolver) {
        for (r, c, v) in self.entries() {
            solver[(r, c)] = v;
        }
        for (r, &b) in self.rhs.iter().enumerate() {
            solver.add_rhs(r + 1, b).unwrap();
        }
    }

    fn solver(&self) -> RealSolver {
        let mut solver = RealSolver::new();
        self.stamp(&mut solver);
        solver
    }

    fn multiply(&self, x: &[f64]) -> Vec<f64> {
        self.dense
            .iter()
            .map(|row| row.iter().zip(&x[1..]).map(|(a, b)| a * b).sum())
            .collect()
    }

    fn multiply_transposed(&self, x: &[f64]) -> Vec<f64> {
        (0..self.size)
            .map(|c| (0..self.size).map(|r| self.dense[r][c] * x[r + 1]).sum())
            .collect()
    }
}

fn arb_system() -> impl Strategy<Value = System> {
    (2usize..9).prop_flat_map(|n| {
        (
            proptest::collection::vec((0..n, 0..n, -5.0f64..5.0), 0..n * n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            proptest::collection::vec(-10.0f64..10.0, n),
        )
            .prop_map(move |(entries, permutation, rhs)| {
                let mut dominant = vec![vec![0.0; n]; n];
                for (r, c, v) in entries {
                    if r != c {
                        dominant[r][c] = v;
                    }
                }
                for (i, row) in dominant.iter_mut().enumerate() {
                    let off: f64 = row.iter().map(|v| v.abs()).sum();
                    row[i] = off + 1.0;
                }
                let dense = permutation.iter().map(|&p| dominant[p].clone()).collect();
                System {
                    size: n,
                    dense,
                    rhs,
                }
            })
    })
}

fn assert_residual(actual: &[f64], expected: &[f64]) -> Result<(), TestCaseError> {
    for (i, (a, b)) in actual.iter().zip(expected).enumerate() {
        let tol = 1e-9 * b.abs().max(1.0);
        prop_assert!((a - b).abs() < tol, "row {}: {} != {}", i + 1, a, b);
    }
    Ok(())
}

/// Dense Gaussian elimination with partial pivoting.
fn dense_solve(system: &System) -> Vec<f64> {
    let n = system.size;
    let mut a = system.dense.clone();
    let mut b = system.rhs.clone();
    for k in 0..n {
        let p = (k..n)
            .max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))
            .unwrap();
        a.swap(k, p);
        b.swap(k, p);
        for i in k + 1..n {
            let m = a[i][k] / a[k][k];
            for j in k..n {
                a[i][j] -= m * a[k][j];
            }
            b[i] -= m * b[k];
        }
    }
    let mut x = vec![0.0; n];
    for k in (0..n).rev() {
        let s: f64 = (k + 1..n).map(|j| a[k][j] * x[j]).sum();
        x[k] = (b[k] - s) / a[k][k];
    }
    x
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn solve_round_trip(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        let x = solver.solve().unwrap();
        prop_assert_eq!(x.len(), system.size + 1);
        prop_assert_eq!(x[0], 0.0);
        assert_residual(&system.multiply(&x), &system.rhs)?;
    }

    #[test]
    fn transposed_round_trip(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        let x = solver.solve_transposed().unwrap();
        assert_residual(&system.multiply_transposed(&x), &system.rhs)?;
    }

    #[test]
    fn matches_dense_solution(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        let x = solver.solve().unwrap();
        let expected = dense_solve(&system);
        for (i, value) in expected.iter().enumerate() {
            let tol = 1e-9 * value.abs().max(1.0);
            prop_assert!((x[i + 1] - value).abs() < tol);
        }
    }

    #[test]
    fn refactor_matches_ordered_factor(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        let ordered = solver.solve().unwrap();

        solver.reset();
        system.stamp(&mut solver);
        prop_assert!(solver.factor().unwrap());
        let refactored = solver.solve().unwrap();
        for (a, b) in ordered.iter().zip(&refactored) {
            prop_assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        }
    }

    #[test]
    fn factor_is_repeatable(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();

        let mut diagonals = Vec::new();
        for _ in 0..2 {
            solver.reset();
            system.stamp(&mut solver);
            prop_assert!(solver.factor().unwrap());
            let diagonal: Vec<f64> = (1..=system.size)
                .map(|i| solver.matrix().value(i, i))
                .collect();
            diagonals.push(diagonal);
        }
        prop_assert_eq!(&diagonals[0], &diagonals[1]);
    }

    #[test]
    fn translations_are_inverse(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        for r in 1..=system.size {
            for c in 1..=system.size {
                let location = MatrixLocation::new(r, c);
                let internal = solver.external_to_internal(location);
                prop_assert_eq!(solver.internal_to_external(internal), location);
                prop_assert_eq!(
                    solver.external_to_internal(solver.internal_to_external(location)),
                    location
                );
            }
        }
    }

    #[test]
    fn chains_stay_sorted(system in arb_system()) {
        let mut solver = system.solver();
        solver.order_and_factor().unwrap();
        let matrix = solver.matrix();
        for i in 1..=system.size {
            let columns: Vec<usize> = matrix.row_elements(i).map(|(_, e)| e.column()).collect();
            prop_assert!(columns.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(columns.iter().all(|&c| c >= 1 && c <= system.size));

            let rows: Vec<usize> = matrix.column_elements(i).map(|(_, e)| e.row()).collect();
            prop_assert!(rows.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(matrix.row_elements(i).all(|(_, e)| e.row() == i));
            prop_assert!(matrix.column_elements(i).all(|(_, e)| e.column() == i));
            prop_assert!(matrix.diagonal(i).is_some());
        }
    }
}

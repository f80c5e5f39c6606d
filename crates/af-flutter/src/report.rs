//! Plain-text listing of evaluated roots.

use crate::roots::RootHistory;
use std::io;

/// One evaluated root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedRoot {
    pub velocity: f64,
    pub growth_rate: f64,
    pub frequency: f64,
}

/// Every root of the sweep and refinement, sorted by velocity then by real
/// part.
pub fn sorted_roots(history: &RootHistory) -> Vec<SortedRoot> {
    let mut roots: Vec<SortedRoot> = history
        .all_sets()
        .flat_map(|set| {
            set.iter().map(move |pair| SortedRoot {
                velocity: set.velocity,
                growth_rate: pair.growth_rate(),
                frequency: pair.frequency(),
            })
        })
        .collect();
    roots.sort_by(|a, b| {
        a.velocity
            .total_cmp(&b.velocity)
            .then(a.growth_rate.total_cmp(&b.growth_rate))
    });
    roots
}

/// One line per root: `velocity growth_rate frequency`.
pub fn write_sorted_roots<W: io::Write>(history: &RootHistory, out: &mut W) -> io::Result<()> {
    for root in sorted_roots(history) {
        writeln!(
            out,
            "{:>18.9e} {:>18.9e} {:>18.9e}",
            root.velocity, root.growth_rate, root.frequency
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::{C64, EigenPair, RootSet};
    use nalgebra::{DMatrix, DVector};

    fn set(velocity: f64, values: &[f64]) -> RootSet {
        RootSet {
            velocity,
            pairs: values
                .iter()
                .map(|v| EigenPair {
                    value: C64::new(*v, 1.0),
                    right: DVector::from_element(1, C64::new(1.0, 0.0)),
                    left: None,
                })
                .collect(),
            b: DMatrix::identity(1, 1),
        }
    }

    #[test]
    fn sorted_by_velocity_then_growth() {
        let mut history = RootHistory::new();
        history.push_sweep(set(10.0, &[-1.0, -3.0]));
        history.push_sweep(set(0.0, &[-2.0]));
        history.push_refinement(set(5.0, &[0.5, -0.5]));

        let roots = sorted_roots(&history);
        let keys: Vec<(f64, f64)> = roots.iter().map(|r| (r.velocity, r.growth_rate)).collect();
        assert_eq!(
            keys,
            vec![(0.0, -2.0), (5.0, -0.5), (5.0, 0.5), (10.0, -3.0), (10.0, -1.0)]
        );

        let mut text = Vec::new();
        write_sorted_roots(&history, &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert_eq!(text.lines().count(), 5);
        let first: Vec<f64> = text
            .lines()
            .next()
            .unwrap()
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(first, vec![0.0, -2.0, 1.0]);
    }
}

use crate::AfError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, AfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AfError::NonFinite { what, value: v })
    }
}

/// `n + 1` evenly spaced points from `start` to `end`, endpoint exact.
pub fn linspace(start: Real, end: Real, divisions: usize) -> Vec<Real> {
    if divisions == 0 {
        return vec![start];
    }

    let delta = (end - start) / divisions as Real;
    let mut points: Vec<Real> = (0..=divisions)
        .map(|i| start + i as Real * delta)
        .collect();

    // Ensure exact endpoint
    points[divisions] = end;
    points
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn linspace_is_monotone_and_even(start in -1e3_f64..1e3, span in 1e-3_f64..1e4, n in 1_usize..200) {
            let end = start + span;
            let pts = linspace(start, end, n);
            prop_assert_eq!(pts.len(), n + 1);
            let step = span / n as f64;
            for w in pts.windows(2) {
                prop_assert!(w[1] > w[0]);
                prop_assert!(((w[1] - w[0]) - step).abs() <= 1e-9 * span.max(1.0));
            }
        }
    }
}

//! Mode correspondence across a velocity sweep and crossing detection.
//!
//! Eigenvalues do not keep a stable order as `V` increases (veering, mode
//! crossing), so roots are matched between consecutive samples by
//! eigenvector alignment under the `B`-weighted inner product rather than by
//! eigenvalue proximity.

use crate::roots::{C64, EigenPair, RootHistory, RootSet};
use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// `xᴴ B y` for complex vectors and a real `B`.
pub fn inner_product(x: &DVector<C64>, b: &DMatrix<f64>, y: &DVector<C64>) -> C64 {
    let mut acc = C64::new(0.0, 0.0);
    for (i, xi) in x.iter().enumerate() {
        let mut row = C64::new(0.0, 0.0);
        for (j, yj) in y.iter().enumerate() {
            row += *yj * b[(i, j)];
        }
        acc += xi.conj() * row;
    }
    acc
}

/// Normalized alignment `|xᴴ B y| / sqrt(|xᴴ B x| |yᴴ B y|)` in `[0, 1]`.
///
/// Falls back to the Euclidean inner product when `B` is not positive on
/// the vectors involved.
pub fn alignment(x: &DVector<C64>, b: &DMatrix<f64>, y: &DVector<C64>) -> f64 {
    if x.len() != y.len() || b.shape() != (x.len(), x.len()) {
        return 0.0;
    }
    let xx = inner_product(x, b, x);
    let yy = inner_product(y, b, y);
    let denom = (xx.norm() * yy.norm()).sqrt();
    if xx.re > 0.0 && yy.re > 0.0 && denom.is_finite() && denom > 0.0 {
        return (inner_product(x, b, y).norm() / denom).min(1.0);
    }

    let denom = x.norm() * y.norm();
    if denom > 0.0 && denom.is_finite() {
        (x.dotc(y).norm() / denom).min(1.0)
    } else {
        0.0
    }
}

/// Which crossing bracket to refine when several modes go unstable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossingPolicy {
    /// First crossing in velocity over all tracked modes.
    #[default]
    LowestVelocity,
    /// Crossing with the largest growth rate at its upper end.
    StrongestGrowth,
    /// First crossing of one tracked mode.
    Mode(usize),
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Minimum alignment accepted as a correspondence.
    pub min_alignment: f64,
    /// Growth rates at or below this count as stable.
    pub neutral_band: f64,
    pub policy: CrossingPolicy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_alignment: 0.25,
            neutral_band: 1e-10,
            policy: CrossingPolicy::default(),
        }
    }
}

/// One root of one sweep sample, as seen from a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    /// Index into the sweep root sets.
    pub sample: usize,
    /// Index into the root set's pairs.
    pub root: usize,
    pub velocity: f64,
    pub value: C64,
}

/// A mode followed across consecutive sweep samples.
///
/// Tracks present at the first sample are numbered in root order; tracks
/// that appear later get the next free index.
#[derive(Debug, Clone)]
pub struct ModeTrack {
    pub mode: usize,
    pub points: Vec<TrackPoint>,
    /// For a track that starts after the first sample: the best-aligned
    /// root of the preceding sample, so a root that is already unstable
    /// when it appears can still be bracketed.
    pub origin: Option<TrackPoint>,
}

impl ModeTrack {
    fn last(&self) -> Option<&TrackPoint> {
        self.points.last()
    }
}

/// Best correspondent of a reference vector within a root set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub index: usize,
    pub alignment: f64,
}

/// One end of a crossing bracket, self-contained so refinement does not
/// need the sweep history.
#[derive(Debug, Clone)]
pub struct BracketEnd {
    pub velocity: f64,
    pub pair: EigenPair,
    pub b: DMatrix<f64>,
}

impl BracketEnd {
    pub fn growth_rate(&self) -> f64 {
        self.pair.growth_rate()
    }
}

/// Velocity interval holding a sign change of one tracked mode's growth
/// rate: stable at `lower`, unstable at `upper`.
#[derive(Debug, Clone)]
pub struct Bracket {
    pub mode: usize,
    pub lower: BracketEnd,
    pub upper: BracketEnd,
    /// A failed sample lies inside the interval, so more than one crossing
    /// may be hidden in it.
    pub spans_failed_sample: bool,
}

impl Bracket {
    pub fn width(&self) -> f64 {
        self.upper.velocity - self.lower.velocity
    }
}

#[derive(Debug, Clone, Default)]
pub struct RootTracker {
    config: TrackingConfig,
}

impl RootTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn is_unstable(&self, growth_rate: f64) -> bool {
        growth_rate > self.config.neutral_band
    }

    /// Best-aligned root in `candidates` for `reference`, regardless of
    /// the acceptance threshold. Ties go to the nearer eigenvalue.
    pub fn closest(
        &self,
        reference: &EigenPair,
        b: &DMatrix<f64>,
        candidates: &RootSet,
    ) -> Option<Correspondence> {
        candidates
            .iter()
            .enumerate()
            .map(|(index, pair)| {
                let score = alignment(&reference.right, b, &pair.right);
                let distance = (pair.value - reference.value).norm();
                (index, score, distance)
            })
            .max_by(|l, r| compare_scores((l.1, l.2), (r.1, r.2)))
            .map(|(index, alignment, _)| Correspondence { index, alignment })
    }

    /// Closest correspondent that passes `min_alignment`.
    pub fn reidentify(
        &self,
        reference: &EigenPair,
        b: &DMatrix<f64>,
        candidates: &RootSet,
    ) -> Option<Correspondence> {
        self.closest(reference, b, candidates)
            .filter(|c| c.alignment >= self.config.min_alignment)
    }

    /// Greedy global matching between two consecutive root sets.
    ///
    /// Returns `matches[i] = Some(j)` when root `i` of `from` continues as
    /// root `j` of `to`. Each root is used at most once.
    pub fn match_roots(&self, from: &RootSet, to: &RootSet) -> Vec<Option<usize>> {
        let mut scored = Vec::with_capacity(from.len() * to.len());
        for (i, p) in from.iter().enumerate() {
            for (j, q) in to.iter().enumerate() {
                let score = alignment(&p.right, &from.b, &q.right);
                if score >= self.config.min_alignment {
                    scored.push((i, j, score, (q.value - p.value).norm()));
                }
            }
        }
        scored.sort_by(|l, r| compare_scores((r.2, r.3), (l.2, l.3)));

        let mut matches = vec![None; from.len()];
        let mut taken = vec![false; to.len()];
        for (i, j, _, _) in scored {
            if matches[i].is_none() && !taken[j] {
                matches[i] = Some(j);
                taken[j] = true;
            }
        }
        matches
    }

    /// Follow every mode through velocity-ordered root sets.
    ///
    /// A track ends when its root finds no correspondent; unmatched roots in
    /// the next sample start new tracks, remembering their closest root in
    /// the previous sample as `origin`.
    pub fn track(&self, sets: &[RootSet]) -> Vec<ModeTrack> {
        let Some(first) = sets.first() else {
            return Vec::new();
        };

        let mut tracks: Vec<ModeTrack> = first
            .iter()
            .enumerate()
            .map(|(root, pair)| ModeTrack {
                mode: root,
                points: vec![TrackPoint {
                    sample: 0,
                    root,
                    velocity: first.velocity,
                    value: pair.value,
                }],
                origin: None,
            })
            .collect();

        for (k, window) in sets.windows(2).enumerate() {
            let (from, to) = (&window[0], &window[1]);
            let matches = self.match_roots(from, to);

            let mut owner = vec![None; from.len()];
            for (t, track) in tracks.iter().enumerate() {
                if let Some(last) = track.last()
                    && last.sample == k
                {
                    owner[last.root] = Some(t);
                }
            }

            let mut continued = vec![false; to.len()];
            for (i, m) in matches.iter().enumerate() {
                let Some(t) = owner[i] else { continue };
                match *m {
                    Some(j) => {
                        tracks[t].points.push(TrackPoint {
                            sample: k + 1,
                            root: j,
                            velocity: to.velocity,
                            value: to.pairs[j].value,
                        });
                        continued[j] = true;
                    }
                    None => warn!(
                        mode = tracks[t].mode,
                        from_velocity = from.velocity,
                        to_velocity = to.velocity,
                        growth_rate = from.pairs[i].growth_rate(),
                        "mode track broke: no correspondent in the next sample"
                    ),
                }
            }

            for (j, pair) in to.iter().enumerate() {
                if continued[j] {
                    continue;
                }
                let origin = self.closest(pair, &to.b, from).map(|c| TrackPoint {
                    sample: k,
                    root: c.index,
                    velocity: from.velocity,
                    value: from.pairs[c.index].value,
                });
                let mode = tracks.len();
                debug!(
                    mode,
                    velocity = to.velocity,
                    growth_rate = pair.growth_rate(),
                    "new mode track"
                );
                tracks.push(ModeTrack {
                    mode,
                    points: vec![TrackPoint {
                        sample: k + 1,
                        root: j,
                        velocity: to.velocity,
                        value: pair.value,
                    }],
                    origin,
                });
            }
        }

        tracks
    }

    /// Every stable-to-unstable transition along the tracks, ordered by
    /// lower velocity. A track's `origin` counts as its first point.
    pub fn find_brackets(&self, history: &RootHistory, tracks: &[ModeTrack]) -> Vec<Bracket> {
        let sets = history.sweep();
        let end = |point: TrackPoint| BracketEnd {
            velocity: point.velocity,
            pair: sets[point.sample].pairs[point.root].clone(),
            b: sets[point.sample].b.clone(),
        };

        let mut brackets = Vec::new();
        for track in tracks {
            let mut previous = track.origin;
            for &point in &track.points {
                if let Some(p) = previous
                    && !self.is_unstable(p.value.re)
                    && self.is_unstable(point.value.re)
                {
                    brackets.push(Bracket {
                        mode: track.mode,
                        lower: end(p),
                        upper: end(point),
                        spans_failed_sample: history
                            .has_failure_between(p.velocity, point.velocity),
                    });
                }
                previous = Some(point);
            }
        }
        brackets.sort_by(|l, r| {
            l.lower
                .velocity
                .total_cmp(&r.lower.velocity)
                .then(l.mode.cmp(&r.mode))
        });
        brackets
    }

    /// Pick the bracket to refine according to the crossing policy.
    pub fn select_bracket<'b>(&self, brackets: &'b [Bracket]) -> Option<&'b Bracket> {
        match self.config.policy {
            CrossingPolicy::LowestVelocity => brackets.iter().min_by(|l, r| {
                l.lower
                    .velocity
                    .total_cmp(&r.lower.velocity)
                    .then(r.upper.growth_rate().total_cmp(&l.upper.growth_rate()))
            }),
            CrossingPolicy::StrongestGrowth => brackets.iter().max_by(|l, r| {
                l.upper
                    .growth_rate()
                    .total_cmp(&r.upper.growth_rate())
                    .then(r.lower.velocity.total_cmp(&l.lower.velocity))
            }),
            CrossingPolicy::Mode(mode) => brackets
                .iter()
                .filter(|b| b.mode == mode)
                .min_by(|l, r| l.lower.velocity.total_cmp(&r.lower.velocity)),
        }
    }
}

/// Higher alignment wins; on equal alignment the smaller distance wins.
fn compare_scores(l: (f64, f64), r: (f64, f64)) -> Ordering {
    l.0.total_cmp(&r.0).then(r.1.total_cmp(&l.1))
}

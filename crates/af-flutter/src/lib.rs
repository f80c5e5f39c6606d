//! Aeroelastic flutter search engine.
//!
//! Given a structural modal basis and a velocity-dependent operator
//! assembler, finds the velocity at which a coupled mode first becomes
//! unstable and the sensitivity of that velocity to design parameters.
//!
//! Pipeline: [`ReducedOperatorBuilder`] → [`GeneralizedEigenSolver`] →
//! [`RootTracker`] (coarse sweep) → [`bisect`] → [`FlutterRoot`] →
//! [`SensitivityEngine`].

pub mod basis;
pub mod bisection;
pub mod eigen;
pub mod error;
pub mod operators;
pub mod report;
pub mod roots;
pub mod sensitivity;
pub mod solver;
pub mod sweep;
pub mod tracker;

pub use basis::ModalBasis;
pub use bisection::{BisectionConfig, BisectionOutcome, BisectionStep, bisect};
pub use eigen::{EigenSolverConfig, GeneralizedEigenSolver, RootOrdering};
pub use error::{FlutterError, FlutterResult};
pub use operators::{
    FullOrderOperators, ModalSolver, OperatorAssembler, ReducedForm, ReducedOperatorBuilder,
    ReducedOperatorPair,
};
pub use report::{SortedRoot, sorted_roots, write_sorted_roots};
pub use roots::{
    C64, EigenPair, FailedSample, FlutterRoot, RootHistory, RootSensitivity, RootSet, SlopeSource,
};
pub use sensitivity::{SensitivityEngine, eigenvalue_sensitivity, velocity_sensitivity};
pub use solver::{FlutterConfig, FlutterSolver, SearchOutcome, SearchProgress};
pub use sweep::{SweepSample, VelocityRange, execute_sweep};
pub use tracker::{
    Bracket, BracketEnd, Correspondence, CrossingPolicy, ModeTrack, RootTracker, TrackPoint, TrackingConfig,
    alignment, inner_product,
};

//! af-core: stable foundation for aeroflutter.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + float helpers)
//! - ids (compact parameter ids)
//! - parameter (named scalars owned by an analysis session)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod parameter;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{AfError, AfResult};
pub use ids::*;
pub use numeric::*;
pub use parameter::{Parameter, ParameterSet};
pub use units::*;

//! Beam structure and piston-theory aerodynamics for flutter analysis.
//!
//! Provides the reference [`BeamPistonAssembler`]: a uniform
//! Euler-Bernoulli beam strip in supersonic flow whose operators, analytic
//! parameter derivatives and in-vacuo modes feed the `af-flutter` search.

pub mod assembler;
pub mod beam;
pub mod error;
pub mod material;
pub mod modal;
pub mod piston;
pub mod section;

pub use assembler::{BeamParameters, BeamPistonAssembler, PanelProperties};
pub use beam::{BeamMesh, Support, UnitMatrices};
pub use error::{StructureError, StructureResult};
pub use material::IsotropicMaterial;
pub use modal::{ModalSolution, solve_modes};
pub use piston::{FlowQuantity, PistonOrder, PistonTheory};
pub use section::RectangularSection;

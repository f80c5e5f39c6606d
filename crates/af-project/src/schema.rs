//! Analysis definition schema.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

/// Parameter names an analysis may differentiate the flutter velocity against.
pub const DESIGN_PARAMETERS: [&str; 9] = [
    "E", "nu", "rho", "thy", "thz", "mach", "rho_air", "gamma", "alpha",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub version: u32,
    pub name: String,
    pub structure: StructureDef,
    pub material: MaterialDef,
    pub section: SectionDef,
    pub flow: FlowDef,
    #[serde(default)]
    pub modal: ModalDef,
    pub search: SearchDef,
    /// Names from [`DESIGN_PARAMETERS`].
    #[serde(default)]
    pub sensitivity: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureDef {
    pub length_m: f64,
    pub elements: usize,
    #[serde(default = "default_support")]
    pub left: SupportDef,
    #[serde(default = "default_support")]
    pub right: SupportDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupportDef {
    Clamped,
    Pinned,
    Free,
}

fn default_support() -> SupportDef {
    SupportDef::Clamped
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialDef {
    pub youngs_modulus_pa: f64,
    pub poisson_ratio: f64,
    pub density_kg_m3: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionDef {
    /// Thickness in the bending plane
    pub thy_m: f64,
    /// Width exposed to the flow
    pub thz_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDef {
    pub mach: f64,
    pub density_kg_m3: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default)]
    pub alpha_rad: f64,
    #[serde(default)]
    pub piston_order: PistonOrderDef,
}

fn default_gamma() -> f64 {
    1.4
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PistonOrderDef {
    #[default]
    First,
    Second,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalDef {
    pub modes: usize,
    #[serde(default)]
    pub form: ReducedFormDef,
}

impl Default for ModalDef {
    fn default() -> Self {
        Self {
            modes: 6,
            form: ReducedFormDef::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReducedFormDef {
    #[default]
    StateSpace,
    Generalized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDef {
    pub lower_mps: f64,
    pub upper_mps: f64,
    pub divisions: usize,
    /// Value of the velocity parameter outside the search
    #[serde(default)]
    pub reference_velocity_mps: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub policy: CrossingPolicyDef,
    #[serde(default = "default_parallel")]
    pub parallel_sweep: bool,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    100
}

fn default_parallel() -> bool {
    true
}

/// Which crossing becomes the critical root when several modes go unstable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossingPolicyDef {
    #[default]
    LowestVelocity,
    StrongestGrowth,
    Mode { index: usize },
}

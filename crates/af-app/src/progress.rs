#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingAnalysis,
    CheckingCache,
    LoadingCachedResult,
    ComputingModes,
    Sweeping,
    Refining,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingAnalysis => "loading",
            Self::CheckingCache => "cache",
            Self::LoadingCachedResult => "cache-load",
            Self::ComputingModes => "modes",
            Self::Sweeping => "sweep",
            Self::Refining => "refine",
            Self::SavingResults => "save",
            Self::Completed => "done",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepProgress {
    pub sample: usize,
    pub total: usize,
    pub velocity_mps: f64,
    /// `None` when the sample failed
    pub max_growth_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefineProgress {
    pub iteration: usize,
    pub velocity_mps: f64,
    pub growth_rate: f64,
    pub bracket_mps: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub sweep: Option<SweepProgress>,
    pub refine: Option<RefineProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            sweep: None,
            refine: None,
        }
    }
}

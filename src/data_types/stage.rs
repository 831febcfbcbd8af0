
use serde::Serialize;
use std::path::PathBuf;
use strum_macros::{EnumIter, EnumString};

/// The pipeline stages, declared in execution order
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, strum_macros::Display, EnumIter, EnumString, Serialize, clap::ValueEnum)]
pub enum StageKind {
    /// Creates the workspace and copies inputs into it
    #[strum(ascii_case_insensitive, serialize = "stage")]
    #[clap(name = "stage")]
    #[serde(rename = "stage")]
    Stage,
    /// Per-sample variant calling, producing GVCFs
    #[strum(ascii_case_insensitive, serialize = "call")]
    #[clap(name = "call")]
    #[serde(rename = "call")]
    Call,
    /// Merges per-sample GVCFs into the cohort store
    #[strum(ascii_case_insensitive, serialize = "consolidate")]
    #[clap(name = "consolidate")]
    #[serde(rename = "consolidate")]
    Consolidate,
    /// Joint genotyping from the cohort store
    #[strum(ascii_case_insensitive, serialize = "genotype")]
    #[clap(name = "genotype")]
    #[serde(rename = "genotype")]
    Genotype,
    /// Pedigree and population prior refinement
    #[strum(ascii_case_insensitive, serialize = "refine")]
    #[clap(name = "refine")]
    #[serde(rename = "refine")]
    Refine,
    /// Calling metrics over each callset
    #[strum(ascii_case_insensitive, serialize = "metrics")]
    #[clap(name = "metrics")]
    #[serde(rename = "metrics")]
    Metrics,
    /// Copies outputs to the publish location and reports inspection paths
    #[strum(ascii_case_insensitive, serialize = "publish")]
    #[clap(name = "publish")]
    #[serde(rename = "publish")]
    Publish
}

/// Final state of a stage within a run
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// All commands finished successfully
    Completed,
    /// Nothing needed to be done, e.g. all samples already had GVCFs
    Skipped,
    /// At least one command failed; later stages did not run
    Failed
}

/// Record of what a single stage did, written into the run summary
#[derive(Clone, Debug, Serialize)]
pub struct StageReport {
    /// Which stage this is
    pub stage: StageKind,
    /// Final status
    pub status: StageStatus,
    /// The rendered command lines, in execution order
    pub commands: Vec<String>,
    /// Files or folders created by the stage
    pub outputs: Vec<PathBuf>,
    /// Wall-clock time for the stage
    pub elapsed_secs: f64,
    /// Error message, if the stage failed
    pub error: Option<String>
}

impl StageReport {
    /// Creates an empty report that is filled in as the stage runs
    pub fn new(stage: StageKind) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            commands: vec![],
            outputs: vec![],
            elapsed_secs: 0.0,
            error: None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_stage_order() {
        let stages: Vec<StageKind> = StageKind::iter().collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&StageKind::Stage));
        assert_eq!(stages.last(), Some(&StageKind::Publish));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(StageKind::Consolidate.to_string(), "consolidate");
        assert_eq!("GENOTYPE".parse::<StageKind>().unwrap(), StageKind::Genotype);
        assert_eq!(serde_json::to_string(&StageKind::Refine).unwrap(), "\"refine\"");
        assert_eq!(serde_json::to_string(&StageStatus::Skipped).unwrap(), "\"skipped\"");
    }
}

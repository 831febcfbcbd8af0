
use derive_builder::Builder;
use log::{error, info};
use serde::Serialize;
use std::time::Instant;
use strum::IntoEnumIterator;

use crate::cli::core::FULL_VERSION;
use crate::data_types::cohort::CohortConfig;
use crate::data_types::stage::{StageKind, StageReport, StageStatus};
use crate::data_types::workspace::Workspace;
use crate::runner::CommandRunner;
use crate::stages::StageContext;
use crate::stages::caller::{CallerConfig, call_samples};
use crate::stages::consolidator::{ConsolidateConfig, consolidate_cohort};
use crate::stages::genotyper::genotype_cohort;
use crate::stages::metrics::collect_metrics;
use crate::stages::publisher::publish_outputs;
use crate::stages::refiner::refine_genotypes;
use crate::stages::stager::stage_inputs;
use crate::util::json_io::save_json;

/// Controls which stages run and how
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct PipelineConfig {
    /// Stages to run; empty means all of them
    stages: Vec<StageKind>,
    /// Per-sample caller settings
    caller: CallerConfig,
    /// Cohort store settings
    consolidate: ConsolidateConfig,
    /// If true, the cohort store is also exported as a multi-sample GVCF
    export_store: bool
}

impl PipelineConfig {
    /// The selected stages in canonical order, without duplicates
    pub fn selected_stages(&self) -> Vec<StageKind> {
        if self.stages.is_empty() {
            return StageKind::iter().collect();
        }
        let mut stages = self.stages.clone();
        stages.sort();
        stages.dedup();
        stages
    }

    // getters
    pub fn caller(&self) -> &CallerConfig {
        &self.caller
    }

    pub fn consolidate(&self) -> &ConsolidateConfig {
        &self.consolidate
    }

    pub fn export_store(&self) -> bool {
        self.export_store
    }
}

/// Everything that happened during one run, saved at the workspace root
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Version of this tool
    pub version: String,
    /// The cohort label
    pub cohort_name: String,
    /// Local start time, RFC 3339
    pub started: String,
    /// If true, no commands were executed
    pub dry_run: bool,
    /// Total wall-clock time
    pub elapsed_secs: f64,
    /// One report per stage that was attempted, in order
    pub stages: Vec<StageReport>
}

impl RunSummary {
    /// The stage that stopped the run, if any
    pub fn failed_stage(&self) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.status == StageStatus::Failed)
    }
}

/// Runs the selected stages for one cohort, in order, stopping at the first failure
pub struct Pipeline<'a, R: CommandRunner> {
    /// The cohort
    config: &'a CohortConfig,
    /// Output layout
    workspace: Workspace,
    /// Executes the commands
    runner: R,
    /// Stage selection and knobs
    pipeline_config: PipelineConfig
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    /// Constructor
    /// # Arguments
    /// * `config` - the cohort, already validated
    /// * `runner` - executes or records the commands
    /// * `pipeline_config` - stage selection and knobs
    pub fn new(config: &'a CohortConfig, runner: R, pipeline_config: PipelineConfig) -> Self {
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        Self {
            config,
            workspace,
            runner,
            pipeline_config
        }
    }

    /// Runs every selected stage. Failures are recorded in the summary rather than returned.
    pub fn run(&self) -> RunSummary {
        let start_time = Instant::now();
        let started = chrono::Local::now().to_rfc3339();
        let ctx = StageContext::new(self.config, &self.workspace, &self.runner);
        let stages = self.pipeline_config.selected_stages();
        info!("Running {} stage(s) for cohort {:?}: {}", stages.len(), self.config.cohort_name, stages.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(", "));

        let mut reports = vec![];
        for stage in stages.into_iter() {
            info!("Starting stage \"{stage}\"...");
            let stage_start = Instant::now();
            let mut report = StageReport::new(stage);
            let result = self.run_stage(&ctx, stage, &mut report);
            report.elapsed_secs = stage_start.elapsed().as_secs_f64();

            let failed = match result {
                Ok(()) => {
                    info!("Stage \"{stage}\" {} in {:.3} seconds.", match report.status {
                        StageStatus::Skipped => "skipped",
                        _ => "completed"
                    }, report.elapsed_secs);
                    false
                },
                Err(e) => {
                    error!("Stage \"{stage}\" failed: {e:#}");
                    report.status = StageStatus::Failed;
                    report.error = Some(format!("{e:#}"));
                    true
                }
            };
            reports.push(report);
            if failed {
                break;
            }
        }

        RunSummary {
            version: FULL_VERSION.clone(),
            cohort_name: self.config.cohort_name.clone(),
            started,
            dry_run: self.runner.is_dry_run(),
            elapsed_secs: start_time.elapsed().as_secs_f64(),
            stages: reports
        }
    }

    /// Dispatches a single stage
    fn run_stage(&self, ctx: &StageContext, stage: StageKind, report: &mut StageReport) -> anyhow::Result<()> {
        let pc = &self.pipeline_config;
        match stage {
            StageKind::Stage => stage_inputs(ctx, report),
            StageKind::Call => call_samples(ctx, pc.caller(), report),
            StageKind::Consolidate => consolidate_cohort(ctx, pc.consolidate(), pc.caller().recall_existing(), report),
            StageKind::Genotype => genotype_cohort(ctx, pc.export_store(), report),
            StageKind::Refine => refine_genotypes(ctx, report),
            StageKind::Metrics => collect_metrics(ctx, report),
            StageKind::Publish => publish_outputs(ctx, report)
        }
    }

    /// Saves the run summary to the workspace root.
    /// Dry runs leave the filesystem untouched, so nothing is written and `None` is returned.
    pub fn save_summary(&self, summary: &RunSummary) -> anyhow::Result<Option<std::path::PathBuf>> {
        if self.runner.is_dry_run() {
            return Ok(None);
        }
        let out_fn = self.workspace.run_summary();
        std::fs::create_dir_all(self.workspace.root())?;
        save_json(summary, &out_fn)?;
        Ok(Some(out_fn))
    }

    // getters
    pub fn runner(&self) -> &R {
        &self.runner
    }
}


use anyhow::{Context, ensure};
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::data_types::cohort::CohortConfig;
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::StageKind;
use crate::pipeline::{PipelineConfig, PipelineConfigBuilder};
use crate::stages::caller::{CallerConfigBuilder, CallerMode};
use crate::stages::consolidator::{ConsolidateConfigBuilder, StoreMode};
use crate::util::json_io::load_json;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct RunSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    jointcall_version: String,

    /// Cohort configuration file (JSON)
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "config")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub config_fn: PathBuf,

    /// Overrides the workspace folder from the configuration
    #[clap(short = 'w')]
    #[clap(long = "workspace")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub workspace: Option<PathBuf>,

    /// Overrides the publish destination from the configuration
    #[clap(long = "publish")]
    #[clap(value_name = "URI")]
    #[clap(help_heading = Some("Input/Output"))]
    pub publish: Option<StorageLocation>,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Stage to run, can be repeated [default: all stages]
    #[clap(short = 's')]
    #[clap(long = "stage")]
    #[clap(value_name = "STAGE")]
    #[clap(help_heading = Some("Execution"))]
    pub stages: Vec<StageKind>,

    /// Logs the commands without running them or touching the filesystem
    #[clap(long = "dry-run")]
    #[clap(help_heading = Some("Execution"))]
    pub dry_run: bool,

    /// Output type of the per-sample caller
    #[clap(long = "caller-mode")]
    #[clap(value_name = "MODE")]
    #[clap(help_heading = Some("Calling"))]
    #[clap(default_value = "gvcf")]
    pub caller_mode: CallerMode,

    /// Also write the re-assembled reads for each called sample
    #[clap(long = "bamout")]
    #[clap(help_heading = Some("Calling"))]
    pub emit_bamout: bool,

    /// Re-call samples that already have a GVCF, if alignments are available
    #[clap(long = "recall-existing")]
    #[clap(help_heading = Some("Calling"))]
    pub recall_existing: bool,

    /// How to treat an existing cohort store
    #[clap(long = "store-mode")]
    #[clap(value_name = "MODE")]
    #[clap(help_heading = Some("Consolidation"))]
    #[clap(default_value = "create")]
    pub store_mode: StoreMode,

    /// Number of GVCFs to import per batch
    #[clap(long = "batch-size")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Consolidation"))]
    pub batch_size: Option<usize>,

    /// Number of threads used to open GVCFs during import
    #[clap(long = "reader-threads")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Consolidation"))]
    pub reader_threads: Option<usize>,

    /// Also export the cohort store as a multi-sample GVCF
    #[clap(long = "export-store")]
    #[clap(help_heading = Some("Genotyping"))]
    pub export_store: bool,

    /// Number of samples to call in parallel
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_run_settings(mut settings: RunSettings) -> anyhow::Result<RunSettings> {
    // hard code the version in
    settings.jointcall_version = FULL_VERSION.clone();
    info!("Jointcall version: {:?}", &settings.jointcall_version);
    info!("Sub-command: run");
    info!("Inputs:");

    check_required_filename(&settings.config_fn, "Cohort configuration")?;
    info!("\tCohort configuration: {:?}", &settings.config_fn);

    info!("Outputs:");
    match settings.workspace.as_ref() {
        Some(w) => info!("\tWorkspace override: {w:?}"),
        None => info!("\tWorkspace override: None")
    };
    match settings.publish.as_ref() {
        Some(p) => info!("\tPublish override: {p}"),
        None => info!("\tPublish override: None")
    };
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Execution:");
    if settings.stages.is_empty() {
        info!("\tStages: all");
    } else {
        let stages: Vec<String> = settings.stages.iter().map(|s| s.to_string()).collect();
        info!("\tStages: {}", stages.join(", "));
    }
    info!("\tDry run: {}", if settings.dry_run { "ENABLED" } else { "DISABLED" });

    info!("Calling parameters:");
    info!("\tCaller mode: {}", settings.caller_mode);
    // plain VCFs cannot be imported into the cohort store
    let consolidates = settings.stages.is_empty() || settings.stages.contains(&StageKind::Consolidate);
    ensure!(
        !(settings.caller_mode == CallerMode::Vcf && consolidates),
        "--caller-mode vcf does not produce GVCFs for the consolidate stage, select the stages explicitly (e.g. --stage call)"
    );
    info!("\tBamout: {}", if settings.emit_bamout { "ENABLED" } else { "DISABLED" });
    info!("\tRecall existing GVCFs: {}", if settings.recall_existing { "ENABLED" } else { "DISABLED" });

    info!("Consolidation parameters:");
    info!("\tStore mode: {}", settings.store_mode);
    if let Some(batch_size) = settings.batch_size {
        ensure!(batch_size > 0, "--batch-size must be >0");
        info!("\tBatch size: {batch_size}");
    }
    if let Some(reader_threads) = settings.reader_threads {
        ensure!(reader_threads > 0, "--reader-threads must be >0");
        info!("\tReader threads: {reader_threads}");
    }
    info!("\tExport store: {}", if settings.export_store { "ENABLED" } else { "DISABLED" });

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}

/// Loads the cohort configuration, applies the command line overrides, and validates the result.
/// # Arguments
/// * `settings` - checked run settings
/// # Errors
/// * if the configuration cannot be parsed or is internally inconsistent
pub fn load_cohort_config(settings: &RunSettings) -> anyhow::Result<CohortConfig> {
    let mut config: CohortConfig = load_json(&settings.config_fn)
        .with_context(|| format!("Error while loading cohort configuration from {:?}:", settings.config_fn))?;
    if let Some(workspace) = settings.workspace.as_ref() {
        config.workspace = workspace.clone();
    }
    if let Some(publish) = settings.publish.as_ref() {
        config.publish = Some(publish.clone());
    }
    config.validate()?;

    info!("Cohort {:?}:", config.cohort_name);
    info!("\tWorkspace: {:?}", config.workspace);
    info!("\tReference: {}", config.reference);
    match config.pedigree.as_ref() {
        Some(p) => info!("\tPedigree: {p}"),
        None => info!("\tPedigree: None")
    };
    let intervals: Vec<String> = config.intervals.iter().map(|i| i.to_string()).collect();
    info!("\tIntervals: {}", if intervals.is_empty() { "all".to_string() } else { intervals.join(", ") });
    info!("\tSamples: {}", config.samples.len());
    for sample in config.samples.iter() {
        let alignments = sample.alignments.as_ref().map(|a| a.to_string()).unwrap_or("None".to_string());
        let gvcf = sample.gvcf.as_ref().map(|g| g.to_string()).unwrap_or("None".to_string());
        info!("\t\t{}: alignments={alignments}, gvcf={gvcf}", sample.name);
    }
    for profile in config.refinement_profiles().iter() {
        info!(
            "\tRefinement profile {:?}: pedigree={}, population callsets={:?}",
            profile.label, profile.use_pedigree, profile.population_callsets
        );
    }
    match config.publish.as_ref() {
        Some(p) => info!("\tPublish: {p}"),
        None => info!("\tPublish: None")
    };

    Ok(config)
}

/// Builds the pipeline configuration from checked run settings
pub fn build_pipeline_config(settings: &RunSettings) -> anyhow::Result<PipelineConfig> {
    let caller = CallerConfigBuilder::default()
        .mode(settings.caller_mode)
        .emit_bamout(settings.emit_bamout)
        .recall_existing(settings.recall_existing)
        .build()?;
    let consolidate = ConsolidateConfigBuilder::default()
        .store_mode(settings.store_mode)
        .batch_size(settings.batch_size)
        .reader_threads(settings.reader_threads)
        .build()?;
    let pipeline_config = PipelineConfigBuilder::default()
        .stages(settings.stages.clone())
        .caller(caller)
        .consolidate(consolidate)
        .export_store(settings.export_store)
        .build()?;
    Ok(pipeline_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::core::{Cli, Commands};
    use clap::Parser;

    fn parse_run(args: &[&str]) -> RunSettings {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Run(settings) => *settings,
            _ => panic!("expected the run subcommand")
        }
    }

    #[test]
    fn test_parse_and_check() {
        let settings = parse_run(&[
            "jointcall", "run", "-c", "test_data/trio/cohort.json",
            "--stage", "refine", "--stage", "genotype",
            "--store-mode", "update", "--batch-size", "50", "--dry-run", "--threads", "0"
        ]);
        let settings = check_run_settings(settings).unwrap();
        assert_eq!(settings.stages, vec![StageKind::Refine, StageKind::Genotype]);
        assert_eq!(settings.store_mode, StoreMode::Update);
        assert_eq!(settings.caller_mode, CallerMode::Gvcf);
        assert_eq!(settings.threads, 1);
        assert!(settings.dry_run);

        let pipeline_config = build_pipeline_config(&settings).unwrap();
        assert_eq!(pipeline_config.selected_stages(), vec![StageKind::Genotype, StageKind::Refine]);
        assert_eq!(pipeline_config.consolidate().batch_size(), Some(50));
    }

    #[test]
    fn test_bad_settings() {
        let missing = parse_run(&["jointcall", "run", "-c", "test_data/trio/missing.json"]);
        assert!(check_run_settings(missing).is_err());

        let zero_batch = parse_run(&["jointcall", "run", "-c", "test_data/trio/cohort.json", "--batch-size", "0"]);
        assert!(check_run_settings(zero_batch).is_err());

        assert!(Cli::try_parse_from(["jointcall", "run", "-c", "x.json", "--stage", "bogus"]).is_err());
    }

    #[test]
    fn test_vcf_mode_needs_explicit_stages() {
        // all stages includes consolidate
        let all_stages = parse_run(&["jointcall", "run", "-c", "test_data/trio/cohort.json", "--caller-mode", "vcf"]);
        assert!(check_run_settings(all_stages).is_err());

        let with_consolidate = parse_run(&[
            "jointcall", "run", "-c", "test_data/trio/cohort.json", "--caller-mode", "vcf",
            "--stage", "call", "--stage", "consolidate", "--recall-existing"
        ]);
        assert!(check_run_settings(with_consolidate).is_err());

        let call_only = parse_run(&["jointcall", "run", "-c", "test_data/trio/cohort.json", "--caller-mode", "vcf", "--stage", "call"]);
        let settings = check_run_settings(call_only).unwrap();
        assert_eq!(settings.caller_mode, CallerMode::Vcf);

        // GVCF mode is unaffected
        let gvcf = parse_run(&["jointcall", "run", "-c", "test_data/trio/cohort.json", "--stage", "consolidate"]);
        assert!(check_run_settings(gvcf).is_ok());
    }

    #[test]
    fn test_overrides() {
        let settings = parse_run(&[
            "jointcall", "run", "-c", "test_data/trio/cohort.json",
            "--workspace", "/tmp/trio-ws", "--publish", "gs://other-bucket/out"
        ]);
        let config = load_cohort_config(&settings).unwrap();
        assert_eq!(config.workspace, PathBuf::from("/tmp/trio-ws"));
        assert_eq!(config.publish, Some("gs://other-bucket/out".parse().unwrap()));

        let bad_publish = Cli::try_parse_from(["jointcall", "run", "-c", "x.json", "--publish", "gs://"]);
        assert!(bad_publish.is_err());
    }
}


use indexmap::IndexMap;
use log::{LevelFilter, error, info, warn};
use std::time::Instant;

use jointcall::cli::core::{Commands, get_cli};
use jointcall::cli::inspect::{InspectSettings, check_inspect_settings};
use jointcall::cli::metrics::{MetricsSettings, check_metrics_settings};
use jointcall::cli::run::{RunSettings, build_pipeline_config, check_run_settings, load_cohort_config};
use jointcall::data_types::gvcf_summary::GvcfSummary;
use jointcall::data_types::stage::StageStatus;
use jointcall::parsing::noodles_helper::scan_gvcf;
use jointcall::pipeline::{Pipeline, RunSummary};
use jointcall::runner::{CommandRunner, DryRunRunner, ProcessRunner};
use jointcall::stages::metrics::summarize_metrics;
use jointcall::util::json_io::save_json;

/// Shared logging setup for all subcommands
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Runs the pipeline with a specific runner and saves the summary; exits if the summary cannot be saved
fn execute_pipeline<R: CommandRunner>(pipeline: Pipeline<'_, R>) -> RunSummary {
    let summary = pipeline.run();
    match pipeline.save_summary(&summary) {
        Ok(Some(summary_fn)) => info!("Run summary saved to {summary_fn:?}"),
        Ok(None) => info!("Dry run, run summary not saved."),
        Err(e) => {
            error!("Error while saving run summary: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    summary
}

fn run_pipeline(settings: RunSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_run_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create a debug folder if specified
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    let cohort_config = match load_cohort_config(&settings) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while loading cohort configuration: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let pipeline_config = match build_pipeline_config(&settings) {
        Ok(pc) => pc,
        Err(e) => {
            error!("Error while building pipeline config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let summary = if settings.dry_run {
        warn!("Dry run enabled, commands will be logged but not executed.");
        execute_pipeline(Pipeline::new(&cohort_config, DryRunRunner::default(), pipeline_config))
    } else {
        execute_pipeline(Pipeline::new(&cohort_config, ProcessRunner, pipeline_config))
    };

    for report in summary.stages.iter() {
        let status = match report.status {
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "FAILED"
        };
        info!("\t{}: {status} ({} command(s), {:.3} seconds)", report.stage, report.commands.len(), report.elapsed_secs);
    }

    if let Some(failed) = summary.failed_stage() {
        error!("Pipeline stopped at stage \"{}\": {}", failed.stage, failed.error.as_deref().unwrap_or("unknown error"));
        std::process::exit(exitcode::SOFTWARE);
    }

    info!("Pipeline completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_inspect(settings: InspectSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_inspect_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let mut all_summaries: IndexMap<String, GvcfSummary> = Default::default();
    for gvcf_fn in settings.gvcf_filenames.iter() {
        info!("Scanning {gvcf_fn:?}...");
        let summary = match scan_gvcf(gvcf_fn) {
            Ok(s) => s,
            Err(e) => {
                error!("Error while scanning GVCF: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        };

        info!("\tSamples: {:?}", summary.samples);
        for (contig, contig_summary) in summary.contigs.iter() {
            info!("\t{contig}: {contig_summary:?}");
        }
        let total = summary.total();
        info!("\tTotal: {total:?}");
        if !summary.is_valid_gvcf() {
            warn!("\t{} record(s) are missing the <NON_REF> allele, this is not a valid GVCF.", total.missing_non_ref);
        }
        all_summaries.insert(gvcf_fn.display().to_string(), summary);
    }

    if let Some(out_fn) = settings.output_json.as_deref() {
        info!("Saving inspection summary to {out_fn:?}...");
        if let Err(e) = save_json(&all_summaries, out_fn) {
            error!("Error while saving inspection summary: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Inspection completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_metrics(settings: MetricsSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_metrics_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let detail_files: Vec<(String, std::path::PathBuf)> = settings.labels.iter().cloned()
        .zip(settings.detail_filenames.iter().cloned())
        .collect();
    if let Err(e) = summarize_metrics(&detail_files, &settings.output_summary_filename) {
        error!("Error while summarizing metrics: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Metrics summary completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Run(settings) => {
            run_pipeline(*settings);
        },
        Commands::Inspect(settings) => {
            run_inspect(*settings);
        },
        Commands::Metrics(settings) => {
            run_metrics(*settings);
        }
    }

    info!("Process finished successfully.");
}

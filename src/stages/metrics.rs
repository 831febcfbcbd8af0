
use anyhow::{Context, anyhow};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::data_types::calling_metrics::{CallsetMetrics, DETAIL_METRICS_SUFFIX};
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::StageReport;
use crate::data_types::workspace::callset_label;
use crate::parsing::picard_metrics::load_detail_metrics;
use crate::runner::ToolCommand;
use crate::stages::StageContext;
use crate::toolkit::GatkLauncher;
use crate::writers::metrics_summary::MetricsSummaryWriter;

/// Builds one CollectVariantCallingMetrics invocation
/// # Arguments
/// * `gatk` - the launcher
/// * `callset` - the VCF to measure
/// * `dbsnp` - known sites
/// * `prefix` - output prefix, the tool appends its own suffixes
pub fn calling_metrics_command(gatk: &GatkLauncher, callset: &Path, dbsnp: &StorageLocation, prefix: &Path) -> ToolCommand {
    gatk.tool("CollectVariantCallingMetrics")
        .option("-I", callset.display())
        .option("--DBSNP", dbsnp)
        .option("-O", prefix.display())
}

/// The detail table the collector writes for a given prefix
pub fn detail_metrics_path(prefix: &Path) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(DETAIL_METRICS_SUFFIX);
    PathBuf::from(name)
}

/// Loads the detail tables for several callsets and writes the combined summary.
/// # Arguments
/// * `detail_files` - pairs of callset label and detail metrics file
/// * `out_filename` - the summary table to write
/// # Errors
/// * if any table fails to load or the summary cannot be written
pub fn summarize_metrics(detail_files: &[(String, PathBuf)], out_filename: &Path) -> anyhow::Result<MetricsSummaryWriter> {
    let mut writer = MetricsSummaryWriter::default();
    for (callset, detail_fn) in detail_files.iter() {
        let samples = load_detail_metrics(detail_fn)?;
        writer.add_callset(&CallsetMetrics {
            callset: callset.clone(),
            samples
        });
    }

    info!("Saving metrics summary to {out_filename:?}...");
    writer.write_summary(out_filename)
        .with_context(|| format!("Error while writing {out_filename:?}:"))?;
    for row in writer.rows().iter() {
        info!("\t{}", row.log_line());
    }
    Ok(writer)
}

/// Collects calling metrics for the joint callset and every refined callset, then summarizes them.
/// # Arguments
/// * `ctx` - the stage context
/// * `report` - collects commands and outputs
/// # Errors
/// * if no dbSNP resource is configured
/// * if the collector fails or its output cannot be parsed
pub fn collect_metrics(ctx: &StageContext, report: &mut StageReport) -> anyhow::Result<()> {
    let workspace = ctx.workspace;
    let dbsnp = ctx.config.resources.dbsnp.as_ref()
        .ok_or(anyhow!("Calling metrics require a dbSNP resource (resources.dbsnp)"))?;

    let mut callsets = vec![workspace.joint_callset()];
    callsets.extend(
        ctx.config.refinement_profiles().iter()
            .map(|p| workspace.refined_callset(&p.label))
    );

    let mut detail_files = vec![];
    for callset in callsets.iter() {
        if !ctx.is_dry_run() && !callset.exists() {
            warn!("Callset {callset:?} not found, skipping its metrics.");
            continue;
        }
        let prefix = workspace.metrics_prefix(callset);
        info!("Collecting metrics for {callset:?}...");
        ctx.execute(report, &calling_metrics_command(&ctx.gatk, callset, dbsnp, &prefix))?;

        let detail_fn = detail_metrics_path(&prefix);
        report.outputs.push(detail_fn.clone());
        detail_files.push((callset_label(callset), detail_fn));
    }

    if ctx.is_dry_run() {
        info!("Dry run, skipping metrics summary.");
    } else if detail_files.is_empty() {
        warn!("No callsets were found, skipping metrics summary.");
    } else {
        let summary_fn = workspace.metrics_summary();
        summarize_metrics(&detail_files, &summary_fn)?;
        report.outputs.push(summary_fn);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::cohort::CohortConfig;
    use crate::data_types::stage::StageKind;
    use crate::data_types::workspace::Workspace;
    use crate::runner::DryRunRunner;
    use crate::util::json_io::load_json;

    fn trio_config() -> CohortConfig {
        load_json(&PathBuf::from("test_data/trio/cohort.json")).unwrap()
    }

    #[test]
    fn test_detail_metrics_path() {
        assert_eq!(
            detail_metrics_path(Path::new("sandbox/trioGGVCF_metrics")),
            PathBuf::from("sandbox/trioGGVCF_metrics.variant_calling_detail_metrics")
        );
    }

    #[test]
    fn test_collect_dry_run() {
        let config = trio_config();
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Metrics);
        collect_metrics(&ctx, &mut report).unwrap();

        let commands: Vec<String> = runner.commands().iter().map(|c| c.to_string()).collect();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            "gatk CollectVariantCallingMetrics -I /home/jupyter-user/2-germline-vd/sandbox/trioGGVCF.vcf \
            --DBSNP /home/jupyter-user/2-germline-vd/resources/dbsnp.vcf \
            -O /home/jupyter-user/2-germline-vd/sandbox/trioGGVCF_metrics"
        );
        assert_eq!(
            runner.commands()[2].values_for("-O"),
            vec!["/home/jupyter-user/2-germline-vd/sandbox/trioCGP_gnomad_metrics"]
        );
    }

    #[test]
    fn test_requires_dbsnp() {
        let mut config = trio_config();
        config.resources.dbsnp = None;
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Metrics);
        assert!(collect_metrics(&ctx, &mut report).is_err());
    }

    #[test]
    fn test_summarize_metrics() {
        let temp = tempfile::tempdir().unwrap();
        let out_fn = temp.path().join("trio_metrics_summary.tsv");
        let detail_fn = PathBuf::from("test_data/metrics/trioGGVCF_metrics.variant_calling_detail_metrics");
        let writer = summarize_metrics(&[
            ("trioGGVCF".to_string(), detail_fn.clone()),
            ("trioCGP".to_string(), detail_fn)
        ], &out_fn).unwrap();
        assert_eq!(writer.rows().len(), 6);
        assert!(out_fn.exists());

        let missing = summarize_metrics(&[("x".to_string(), temp.path().join("missing"))], &out_fn);
        assert!(missing.is_err());
    }
}

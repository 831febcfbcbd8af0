
use anyhow::ensure;
use log::{info, warn};
use std::path::Path;

use crate::data_types::interval::GenomicInterval;
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::StageReport;
use crate::runner::ToolCommand;
use crate::stages::StageContext;
use crate::toolkit::GatkLauncher;

/// URI scheme GATK uses for a cohort store
pub const GENDB_SCHEME: &str = "gendb://";

/// Renders a store folder as a tool input
pub fn gendb_uri(store: &Path) -> String {
    format!("{GENDB_SCHEME}{}", store.display())
}

/// Builds the joint genotyping invocation
/// # Arguments
/// * `gatk` - the launcher
/// * `reference` - reference FASTA
/// * `store` - the cohort store folder
/// * `output` - the joint callset to write
/// * `intervals` - optional restriction intervals
pub fn genotype_command(gatk: &GatkLauncher, reference: &StorageLocation, store: &Path, output: &Path, intervals: &[GenomicInterval]) -> ToolCommand {
    gatk.tool("GenotypeGVCFs")
        .option("-R", reference)
        .option("-V", gendb_uri(store))
        .option("-O", output.display())
        .repeated("-L", intervals)
}

/// Builds the command that writes the cohort store back out as a multi-sample GVCF
/// # Arguments
/// * `gatk` - the launcher
/// * `reference` - reference FASTA, required to read the store
/// * `store` - the cohort store folder
/// * `output` - the GVCF to write
pub fn export_store_command(gatk: &GatkLauncher, reference: &StorageLocation, store: &Path, output: &Path) -> ToolCommand {
    gatk.tool("SelectVariants")
        .option("-R", reference)
        .option("-V", gendb_uri(store))
        .option("-O", output.display())
}

/// Produces the joint callset from the cohort store, optionally exporting the store contents first.
/// # Arguments
/// * `ctx` - the stage context
/// * `export_store` - if true, also write the store as a multi-sample GVCF
/// * `report` - collects commands and outputs
/// # Errors
/// * if the store is missing outside of a dry run
/// * if either tool fails
pub fn genotype_cohort(ctx: &StageContext, export_store: bool, report: &mut StageReport) -> anyhow::Result<()> {
    let workspace = ctx.workspace;
    let store = workspace.cohort_store();
    if ctx.is_dry_run() {
        if !store.exists() {
            warn!("Cohort store {store:?} does not exist yet, continuing with the dry run.");
        }
    } else {
        ensure!(store.is_dir(), "Cohort store not found at {store:?}, run the consolidate stage first");
    }

    if export_store {
        let exported = workspace.exported_store();
        info!("Exporting cohort store to {exported:?}...");
        ctx.execute(report, &export_store_command(&ctx.gatk, &ctx.config.reference, &store, &exported))?;
        report.outputs.push(exported);
    }

    let joint = workspace.joint_callset();
    info!("Joint genotyping {} sample(s) into {joint:?}...", ctx.config.samples.len());
    let command = genotype_command(&ctx.gatk, &ctx.config.reference, &store, &joint, &ctx.config.intervals);
    ctx.execute(report, &command)?;
    report.outputs.push(joint);
    Ok(())
}

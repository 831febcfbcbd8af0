
use anyhow::{Context, bail, ensure};
use derive_builder::Builder;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::EnumString;

use crate::data_types::cohort::CohortConfig;
use crate::data_types::interval::GenomicInterval;
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::{StageReport, StageStatus};
use crate::data_types::workspace::Workspace;
use crate::parsing::noodles_helper::get_vcf_sample_names;
use crate::runner::ToolCommand;
use crate::stages::StageContext;
use crate::toolkit::GatkLauncher;
use crate::util::json_io::load_json;

/// File inside a cohort store that lists the member samples
pub const CALLSET_FILENAME: &str = "callset.json";

/// How to treat an existing cohort store
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum StoreMode {
    /// Create a new store; refuse if one already exists
    #[default]
    #[strum(ascii_case_insensitive, serialize = "create")]
    #[clap(name = "create")]
    Create,
    /// Add samples that are not yet in the store, leaving existing data untouched
    #[strum(ascii_case_insensitive, serialize = "update")]
    #[clap(name = "update")]
    Update,
    /// Delete any existing store and rebuild it from all samples
    #[strum(ascii_case_insensitive, serialize = "overwrite")]
    #[clap(name = "overwrite")]
    Overwrite
}

/// Controls the consolidation step
#[derive(Builder, Clone, Copy, Debug, Default)]
#[builder(default)]
pub struct ConsolidateConfig {
    /// Existing store handling
    store_mode: StoreMode,
    /// Number of GVCFs imported per batch; None lets the tool decide
    batch_size: Option<usize>,
    /// Number of threads used to open GVCFs
    reader_threads: Option<usize>
}

impl ConsolidateConfig {
    // getters
    pub fn store_mode(&self) -> StoreMode {
        self.store_mode
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    pub fn reader_threads(&self) -> Option<usize> {
        self.reader_threads
    }
}

/// Subset of the store's callset listing that we need
#[derive(Deserialize)]
struct CallsetManifest {
    callsets: Vec<CallsetEntry>
}

#[derive(Deserialize)]
struct CallsetEntry {
    sample_name: String
}

/// Loads the sample names already present in a cohort store
/// # Arguments
/// * `store` - the store folder
pub fn load_store_samples(store: &Path) -> anyhow::Result<Vec<String>> {
    let manifest_fn = store.join(CALLSET_FILENAME);
    let manifest: CallsetManifest = load_json(&manifest_fn)
        .with_context(|| format!("Error while loading samples from cohort store {store:?}:"))?;
    Ok(manifest.callsets.into_iter().map(|c| c.sample_name).collect())
}

/// Resolves the GVCF for every sample: either the configured one or the per-sample caller output
/// # Arguments
/// * `config` - the cohort
/// * `workspace` - workspace layout
/// * `recalled` - if true, every sample with alignments uses the caller output
pub fn cohort_gvcfs(config: &CohortConfig, workspace: &Workspace, recalled: bool) -> Vec<(String, StorageLocation)> {
    config.samples.iter()
        .map(|sample| {
            let location = match (&sample.gvcf, recalled && sample.alignments.is_some()) {
                (Some(gvcf), false) => gvcf.clone(),
                _ => StorageLocation::Local(workspace.sample_gvcf(&sample.name))
            };
            (sample.name.clone(), location)
        })
        .collect()
}

/// Checks that every local GVCF that already exists holds exactly the expected sample.
/// Remote files and files not yet produced are skipped.
/// # Arguments
/// * `gvcfs` - sample name and GVCF location pairs
pub fn check_gvcf_samples(gvcfs: &[(String, StorageLocation)]) -> anyhow::Result<()> {
    for (sample_name, location) in gvcfs.iter() {
        let Some(path) = location.local_path() else {
            continue;
        };
        if !path.exists() {
            continue;
        }
        let header_samples = get_vcf_sample_names(path)?;
        ensure!(
            header_samples.len() == 1 && &header_samples[0] == sample_name,
            "GVCF {path:?} contains samples {header_samples:?}, expected only {sample_name:?}"
        );
    }
    Ok(())
}

/// Builds one GenomicsDBImport invocation.
/// Updates cannot take intervals, the store keeps the ones it was created with.
/// # Arguments
/// * `gatk` - the launcher
/// * `gvcfs` - the GVCFs to import
/// * `store` - the store folder
/// * `intervals` - intervals for a new store
/// * `update` - if true, append to an existing store
/// * `consolidate_config` - batch and thread settings
pub fn import_command(
    gatk: &GatkLauncher,
    gvcfs: &[&StorageLocation],
    store: &Path,
    intervals: &[GenomicInterval],
    update: bool,
    consolidate_config: &ConsolidateConfig
) -> ToolCommand {
    let command = gatk.tool("GenomicsDBImport")
        .repeated("-V", gvcfs.iter());
    let command = if update {
        command.option("--genomicsdb-update-workspace-path", store.display())
    } else {
        command
            .option("--genomicsdb-workspace-path", store.display())
            .repeated("--intervals", intervals)
    };
    command
        .optional("--batch-size", consolidate_config.batch_size())
        .optional("--reader-threads", consolidate_config.reader_threads())
}

/// Creates or updates the cohort store from the per-sample GVCFs.
/// # Arguments
/// * `ctx` - the stage context
/// * `consolidate_config` - store handling
/// * `recalled` - true if the caller re-called samples that had GVCFs
/// * `report` - collects commands and outputs
/// # Errors
/// * if a store exists and the mode is `Create`
/// * if a new store would be created without intervals
/// * if a local GVCF holds the wrong sample
pub fn consolidate_cohort(ctx: &StageContext, consolidate_config: &ConsolidateConfig, recalled: bool, report: &mut StageReport) -> anyhow::Result<()> {
    let store = ctx.workspace.cohort_store();
    let gvcfs = cohort_gvcfs(ctx.config, ctx.workspace, recalled);
    check_gvcf_samples(&gvcfs)?;

    let store_exists = store.exists();
    let (to_import, update): (Vec<&StorageLocation>, bool) = match (store_exists, consolidate_config.store_mode()) {
        (false, mode) => {
            if mode == StoreMode::Update {
                warn!("No cohort store at {store:?}, creating a new one.");
            }
            (gvcfs.iter().map(|(_n, g)| g).collect(), false)
        },
        (true, StoreMode::Create) => {
            bail!("Cohort store already exists at {store:?}; use the update store mode to add samples or overwrite to rebuild it");
        },
        (true, StoreMode::Overwrite) => {
            if ctx.is_dry_run() {
                info!("[dry-run] remove {store:?}");
            } else {
                warn!("Removing existing cohort store at {store:?}...");
                std::fs::remove_dir_all(&store)
                    .with_context(|| format!("Error while removing {store:?}:"))?;
            }
            (gvcfs.iter().map(|(_n, g)| g).collect(), false)
        },
        (true, StoreMode::Update) => {
            let existing = load_store_samples(&store)?;
            info!("Cohort store has {} existing sample(s): {existing:?}", existing.len());
            let new_gvcfs: Vec<&StorageLocation> = gvcfs.iter()
                .filter(|(name, _g)| !existing.contains(name))
                .map(|(_n, g)| g)
                .collect();
            (new_gvcfs, true)
        }
    };

    if to_import.is_empty() {
        info!("Every sample is already in the cohort store, nothing to import.");
        report.status = StageStatus::Skipped;
        return Ok(());
    }
    ensure!(update || !ctx.config.intervals.is_empty(), "Creating a cohort store requires at least one interval");

    info!("Importing {} GVCF(s) into {store:?}...", to_import.len());
    let command = import_command(&ctx.gatk, &to_import, &store, &ctx.config.intervals, update, consolidate_config);
    ctx.execute(report, &command)?;
    report.outputs.push(store);
    Ok(())
}


use anyhow::Context;
use log::{info, warn};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data_types::cohort::CohortConfig;
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::{StageReport, StageStatus};
use crate::data_types::workspace::Workspace;
use crate::stages::metrics::detail_metrics_path;
use crate::stages::{StageContext, folder_destination};

/// Index suffixes that travel with a published file
const INDEX_SUFFIXES: [&str; 3] = [".idx", ".tbi", ".bai"];

/// Every output the pipeline can produce, in a stable order
fn candidate_outputs(config: &CohortConfig, workspace: &Workspace) -> Vec<PathBuf> {
    let mut ret = vec![];
    for sample in config.samples.iter() {
        ret.push(workspace.sample_gvcf(&sample.name));
        ret.push(workspace.sample_vcf(&sample.name));
        ret.push(workspace.sample_bamout(&sample.name));
    }
    ret.push(workspace.exported_store());

    let mut callsets = vec![workspace.joint_callset()];
    callsets.extend(config.refinement_profiles().iter().map(|p| workspace.refined_callset(&p.label)));
    for callset in callsets.into_iter() {
        let detail = detail_metrics_path(&workspace.metrics_prefix(&callset));
        ret.push(callset);
        ret.push(detail);
    }
    ret.push(workspace.metrics_summary());
    ret
}

/// Index files next to an output that exist on disk
fn existing_indices(path: &Path) -> Vec<PathBuf> {
    let mut ret = vec![];
    for suffix in INDEX_SUFFIXES {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        let index = PathBuf::from(name);
        if index.exists() {
            ret.push(index);
        }
    }
    // the caller writes "xHCdebug.bai" rather than "xHCdebug.bam.bai"
    if path.extension().unwrap_or_default() == "bam" {
        let index = path.with_extension("bai");
        if index.exists() {
            ret.push(index);
        }
    }
    ret
}

/// Selects the outputs to publish.
/// On a real run these are the outputs (and their indices) present on disk.
/// On a dry run, nothing exists yet, so the cohort-level callsets and the metrics summary are listed.
/// # Arguments
/// * `config` - the cohort
/// * `workspace` - workspace layout
/// * `dry_run` - if true, list the expected outputs instead of checking the disk
pub fn collect_publishable(config: &CohortConfig, workspace: &Workspace, dry_run: bool) -> Vec<PathBuf> {
    if dry_run {
        let mut ret = vec![workspace.joint_callset()];
        ret.extend(config.refinement_profiles().iter().map(|p| workspace.refined_callset(&p.label)));
        ret.push(workspace.metrics_summary());
        return ret;
    }

    let mut ret = vec![];
    for path in candidate_outputs(config, workspace).into_iter() {
        if path.is_file() {
            let indices = existing_indices(&path);
            ret.push(path);
            ret.extend(indices);
        }
    }
    ret
}

/// Builds the list of paths a reader would load into a genome browser: the alignments,
/// then the per-sample and cohort callsets as they will be found after publishing.
/// # Arguments
/// * `config` - the cohort
/// * `published` - the local files and where each one ends up
pub fn inspection_paths(config: &CohortConfig, published: &[(PathBuf, StorageLocation)]) -> Vec<String> {
    let mut ret: Vec<String> = config.samples.iter()
        .filter_map(|s| s.alignments.as_ref().map(|a| a.to_string()))
        .collect();
    ret.extend(
        published.iter()
            .filter(|(local, _dest)| {
                let name = local.to_string_lossy();
                name.ends_with(".vcf") || name.ends_with(".vcf.gz") || name.ends_with(".bam")
            })
            .map(|(_local, dest)| dest.to_string())
    );
    ret
}

/// Writes one path per line
fn save_inspection_paths(paths: &[String], out_filename: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;
    let mut writer = BufWriter::new(file);
    for path in paths.iter() {
        writeln!(writer, "{path}")?;
    }
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

/// Copies finished outputs to the publish destination and records the paths for manual inspection.
/// # Arguments
/// * `ctx` - the stage context
/// * `report` - collects commands and outputs
/// # Errors
/// * if the copy fails
/// * if the inspection path list cannot be written
pub fn publish_outputs(ctx: &StageContext, report: &mut StageReport) -> anyhow::Result<()> {
    let config = ctx.config;
    let workspace = ctx.workspace;
    let files = collect_publishable(config, workspace, ctx.is_dry_run());

    let published: Vec<(PathBuf, StorageLocation)> = match config.publish.as_ref() {
        None => {
            info!("No publish destination configured, outputs stay in {:?}.", workspace.sandbox());
            report.status = StageStatus::Skipped;
            files.iter()
                .map(|f| (f.clone(), StorageLocation::Local(f.clone())))
                .collect()
        },
        Some(_) if files.is_empty() => {
            warn!("No outputs found under {:?}, nothing to publish.", workspace.sandbox());
            report.status = StageStatus::Skipped;
            vec![]
        },
        Some(destination) => {
            info!("Publishing {} file(s) to {destination}...", files.len());
            let mut published = vec![];
            for f in files.iter() {
                let file_name = f.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                published.push((f.clone(), destination.join(&file_name)));
            }

            match destination {
                StorageLocation::Remote(uri) => {
                    let sources: Vec<StorageLocation> = files.iter().cloned().map(StorageLocation::from).collect();
                    let command = ctx.storage.copy(sources.iter(), &format!("{}/", uri.trim_end_matches('/')));
                    ctx.execute(report, &command)?;
                },
                StorageLocation::Local(folder) => {
                    if ctx.is_dry_run() {
                        info!("[dry-run] copy {} file(s) -> {}", files.len(), folder_destination(folder));
                    } else {
                        std::fs::create_dir_all(folder)
                            .with_context(|| format!("Error while creating {folder:?}:"))?;
                        for (source, target) in published.iter() {
                            let target = target.local_path().unwrap_or(source);
                            std::fs::copy(source, target)
                                .with_context(|| format!("Error while copying {source:?} to {target:?}:"))?;
                        }
                    }
                }
            };
            report.outputs.extend(published.iter().filter_map(|(_s, d)| d.local_path().map(|p| p.to_path_buf())));
            published
        }
    };

    let paths = inspection_paths(config, &published);
    info!("Paths for manual inspection:");
    for path in paths.iter() {
        info!("\t{path}");
    }
    if !ctx.is_dry_run() {
        let out_fn = workspace.inspection_paths();
        save_inspection_paths(&paths, &out_fn)?;
        report.outputs.push(out_fn);
    }
    Ok(())
}

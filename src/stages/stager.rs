
use anyhow::{Context, anyhow, ensure};
use log::{info, warn};
use std::path::PathBuf;

use crate::data_types::location::StorageLocation;
use crate::data_types::stage::StageReport;
use crate::stages::{StageContext, folder_destination};

/// Creates the workspace folders and copies every staging item into place.
/// Remote sources are listed first so that an inaccessible bucket fails before any copy starts.
/// # Arguments
/// * `ctx` - the stage context
/// * `report` - collects commands and outputs
/// # Errors
/// * if a folder cannot be created or a local copy fails
/// * if a remote listing or copy fails
/// * if a local source uses a wildcard
pub fn stage_inputs(ctx: &StageContext, report: &mut StageReport) -> anyhow::Result<()> {
    let workspace = ctx.workspace;
    if ctx.is_dry_run() {
        info!("Dry run, workspace folders will not be created under {:?}", workspace.root());
    } else {
        info!("Creating workspace folders under {:?}...", workspace.root());
        workspace.create_directories()?;
    }
    report.outputs.extend(workspace.directories());

    if ctx.config.staging.is_empty() {
        info!("No inputs configured for staging.");
        return Ok(());
    }

    // check everything remote is reachable before we copy anything
    for item in ctx.config.staging.iter().filter(|i| i.source.is_remote()) {
        info!("Checking access to {}...", item.source);
        ctx.execute(report, &ctx.storage.list(&item.source))?;
    }

    for item in ctx.config.staging.iter() {
        let dest_folder = workspace.root().join(&item.destination);
        if !ctx.is_dry_run() {
            std::fs::create_dir_all(&dest_folder)
                .with_context(|| format!("Error while creating {dest_folder:?}:"))?;
        }

        match &item.source {
            StorageLocation::Remote(_) => {
                let command = ctx.storage.copy([&item.source], &folder_destination(&dest_folder));
                ctx.execute(report, &command)?;
            },
            StorageLocation::Local(source_path) => {
                ensure!(!item.source.is_pattern(), "Wildcards are only supported for remote sources: {source_path:?}");
                let file_name = source_path.file_name()
                    .ok_or(anyhow!("Local staging source has no file name: {source_path:?}"))?;
                let target: PathBuf = dest_folder.join(file_name);
                if ctx.is_dry_run() {
                    info!("[dry-run] copy {source_path:?} -> {target:?}");
                } else if target.exists() && same_file(source_path, &target) {
                    warn!("Skipping copy of {source_path:?}, it is already in the workspace.");
                } else {
                    info!("Copying {source_path:?} -> {target:?}...");
                    std::fs::copy(source_path, &target)
                        .with_context(|| format!("Error while copying {source_path:?} to {target:?}:"))?;
                }
            }
        };

        if !report.outputs.contains(&dest_folder) {
            report.outputs.push(dest_folder);
        }
    }

    Ok(())
}

/// Returns true if both paths resolve to the same file
fn same_file(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::cohort::{CohortConfig, StagingItem};
    use crate::data_types::workspace::Workspace;
    use crate::runner::DryRunRunner;
    use crate::util::json_io::load_json;

    fn trio_config() -> CohortConfig {
        load_json(&PathBuf::from("test_data/trio/cohort.json")).unwrap()
    }

    #[test]
    fn test_remote_staging_dry_run() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = trio_config();
        config.workspace = temp.path().join("ws");
        let ws = config.workspace.display().to_string();
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);

        let mut report = StageReport::new(crate::data_types::stage::StageKind::Stage);
        stage_inputs(&ctx, &mut report).unwrap();

        let commands: Vec<String> = runner.commands().iter().map(|c| c.to_string()).collect();
        assert_eq!(commands.len(), 8);
        assert_eq!(commands[0], "gsutil ls 'gs://gatk-tutorials/workshop_1910/2-germline/ref/*'");
        assert_eq!(commands[4], format!("gsutil cp 'gs://gatk-tutorials/workshop_1910/2-germline/ref/*' {ws}/ref/"));
        assert_eq!(commands[5], format!("gsutil cp gs://gatk-tutorials/workshop_1910/2-germline/trio.ped {ws}/"));
        assert_eq!(report.commands, commands);

        // nothing was created on disk
        assert!(!temp.path().join("ws").exists());
    }

    #[test]
    fn test_local_staging() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = trio_config();
        config.workspace = temp.path().join("ws");
        config.staging = vec![StagingItem {
            source: StorageLocation::Local(PathBuf::from("test_data/trio/trio.ped")),
            destination: PathBuf::from("pedigree")
        }];
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = crate::runner::ProcessRunner;
        let ctx = StageContext::new(&config, &workspace, &runner);

        let mut report = StageReport::new(crate::data_types::stage::StageKind::Stage);
        stage_inputs(&ctx, &mut report).unwrap();
        assert!(report.commands.is_empty());
        assert!(workspace.sandbox().is_dir());
        assert!(temp.path().join("ws/pedigree/trio.ped").is_file());

        // second run is a no-op copy over the existing file
        stage_inputs(&ctx, &mut report).unwrap();
    }

    #[test]
    fn test_local_pattern_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = trio_config();
        config.workspace = temp.path().to_path_buf();
        config.staging = vec![StagingItem {
            source: StorageLocation::Local(PathBuf::from("test_data/trio/*")),
            destination: PathBuf::new()
        }];
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = crate::runner::ProcessRunner;
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(crate::data_types::stage::StageKind::Stage);
        assert!(stage_inputs(&ctx, &mut report).is_err());
    }
}

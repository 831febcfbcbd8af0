
use anyhow::anyhow;
use log::{info, warn};
use std::path::Path;

use crate::data_types::cohort::{CohortConfig, RefinementProfile};
use crate::data_types::location::StorageLocation;
use crate::data_types::pedigree::Pedigree;
use crate::data_types::stage::{StageReport, StageStatus};
use crate::runner::ToolCommand;
use crate::stages::StageContext;
use crate::toolkit::GatkLauncher;

/// Builds one CalculateGenotypePosteriors invocation for a refinement profile.
/// Without population callsets, population priors are explicitly skipped.
/// # Arguments
/// * `gatk` - the launcher
/// * `joint_callset` - the joint callset to refine
/// * `pedigree` - the PED file, used when the profile asks for it
/// * `population_callsets` - supporting callsets for the profile
/// * `output` - the refined callset to write
pub fn posteriors_command(
    gatk: &GatkLauncher,
    joint_callset: &Path,
    pedigree: Option<&StorageLocation>,
    population_callsets: &[&StorageLocation],
    output: &Path
) -> ToolCommand {
    gatk.tool("CalculateGenotypePosteriors")
        .option("-V", joint_callset.display())
        .optional("-ped", pedigree)
        .switch("--skip-population-priors", population_callsets.is_empty())
        .repeated("--supporting-callsets", population_callsets.iter())
        .option("-O", output.display())
}

/// Resolves the population callsets a profile refers to
/// # Errors
/// * if a label is not in the configured resources
fn profile_callsets<'a>(config: &'a CohortConfig, profile: &RefinementProfile) -> anyhow::Result<Vec<&'a StorageLocation>> {
    profile.population_callsets.iter()
        .map(|label| {
            config.resources.population_callsets.get(label)
                .ok_or(anyhow!("Unknown population callset {label:?} in refinement profile {:?}", profile.label))
        })
        .collect()
}

/// Loads a local pedigree and reports the trios that priors will act on.
/// Samples missing from the pedigree are refined without family priors, so they only produce a warning.
fn report_pedigree(pedigree_fn: &Path, sample_names: &[&str]) -> anyhow::Result<()> {
    let pedigree = Pedigree::from_ped_file(pedigree_fn)?;
    let trios = pedigree.trios();
    info!("Loaded pedigree with {} individual(s) and {} trio(s):", pedigree.len(), trios.len());
    for trio in trios.iter() {
        info!("\t{}: {} (father: {}, mother: {})", trio.family_id, trio.child, trio.father, trio.mother);
    }
    let missing = pedigree.missing_samples(sample_names);
    if !missing.is_empty() {
        warn!("Samples missing from the pedigree: {missing:?}");
    }
    Ok(())
}

/// Runs every refinement profile against the joint callset.
/// # Arguments
/// * `ctx` - the stage context
/// * `report` - collects commands and outputs
/// # Errors
/// * if the pedigree is local and cannot be parsed
/// * if a profile references an unknown population callset
/// * if any refinement command fails
pub fn refine_genotypes(ctx: &StageContext, report: &mut StageReport) -> anyhow::Result<()> {
    let config = ctx.config;
    let profiles = config.refinement_profiles();
    if profiles.is_empty() {
        info!("No pedigree or refinement profiles configured, nothing to refine.");
        report.status = StageStatus::Skipped;
        return Ok(());
    }

    // remote pedigrees are handed to the tool as-is
    if let Some(pedigree_fn) = config.pedigree.as_ref().and_then(|p| p.local_path()) {
        if pedigree_fn.exists() {
            report_pedigree(pedigree_fn, &config.sample_names())?;
        } else if !ctx.is_dry_run() {
            warn!("Pedigree {pedigree_fn:?} not found, the refinement tool will likely fail.");
        }
    }

    let joint = ctx.workspace.joint_callset();
    for profile in profiles.iter() {
        let callsets = profile_callsets(config, profile)?;
        let pedigree = if profile.use_pedigree { config.pedigree.as_ref() } else { None };
        let output = ctx.workspace.refined_callset(&profile.label);
        let display_label = if profile.label.is_empty() { "default" } else { profile.label.as_str() };
        info!(
            "Refining with profile {display_label:?} (pedigree: {}, population callsets: {})...",
            pedigree.is_some(), callsets.len()
        );

        let command = posteriors_command(&ctx.gatk, &joint, pedigree, &callsets, &output);
        ctx.execute(report, &command)?;
        report.outputs.push(output);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::stage::StageKind;
    use crate::data_types::workspace::Workspace;
    use crate::runner::DryRunRunner;
    use crate::util::json_io::load_json;
    use std::path::PathBuf;

    fn trio_config() -> CohortConfig {
        load_json(&PathBuf::from("test_data/trio/cohort.json")).unwrap()
    }

    #[test]
    fn test_pedigree_only_command() {
        let gatk = GatkLauncher::new("gatk", None);
        let ped: StorageLocation = "trio.ped".parse().unwrap();
        let command = posteriors_command(
            &gatk, Path::new("sandbox/trioGGVCF.vcf"), Some(&ped), &[], Path::new("sandbox/trioCGP.vcf")
        );
        assert_eq!(
            command.to_string(),
            "gatk CalculateGenotypePosteriors -V sandbox/trioGGVCF.vcf -ped trio.ped \
            --skip-population-priors -O sandbox/trioCGP.vcf"
        );
    }

    #[test]
    fn test_population_command() {
        let gatk = GatkLauncher::new("gatk", None);
        let gnomad: StorageLocation = "resources/af-only-gnomad.chr20subset.b37.vcf.gz".parse().unwrap();
        let command = posteriors_command(
            &gatk, Path::new("sandbox/trioGGVCF.vcf"), None, &[&gnomad], Path::new("sandbox/trioCGP_gnomad.vcf")
        );
        assert!(!command.has_arg("--skip-population-priors"));
        assert!(!command.has_arg("-ped"));
        assert_eq!(command.values_for("--supporting-callsets"), vec!["resources/af-only-gnomad.chr20subset.b37.vcf.gz"]);
    }

    #[test]
    fn test_refine_dry_run() {
        let config = trio_config();
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Refine);
        refine_genotypes(&ctx, &mut report).unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].has_arg("--skip-population-priors"));
        assert_eq!(commands[0].values_for("-ped"), vec!["/home/jupyter-user/2-germline-vd/trio.ped"]);
        assert_eq!(commands[1].values_for("-ped"), vec!["/home/jupyter-user/2-germline-vd/trio.ped"]);
        assert_eq!(commands[1].values_for("--supporting-callsets").len(), 1);
        assert_eq!(report.outputs, vec![workspace.refined_callset(""), workspace.refined_callset("gnomad")]);
    }

    #[test]
    fn test_default_profile_and_skip() {
        let mut config = trio_config();
        config.refinement.clear();
        config.pedigree = Some(StorageLocation::Local(PathBuf::from("test_data/trio/trio.ped")));
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Refine);
        refine_genotypes(&ctx, &mut report).unwrap();
        assert_eq!(runner.commands().len(), 1);
        assert_eq!(report.outputs, vec![workspace.refined_callset("")]);

        // no pedigree and no profiles means nothing to do
        config.pedigree = None;
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Refine);
        refine_genotypes(&ctx, &mut report).unwrap();
        assert_eq!(report.status, StageStatus::Skipped);
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_unknown_callset() {
        let mut config = trio_config();
        config.resources.population_callsets.clear();
        let workspace = Workspace::new(config.workspace.clone(), &config.cohort_name);
        let runner = DryRunRunner::default();
        let ctx = StageContext::new(&config, &workspace, &runner);
        let mut report = StageReport::new(StageKind::Refine);
        assert!(refine_genotypes(&ctx, &mut report).is_err());
    }
}

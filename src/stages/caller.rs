
use derive_builder::Builder;
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use strum_macros::EnumString;

use crate::data_types::cohort::SampleSpec;
use crate::data_types::interval::GenomicInterval;
use crate::data_types::location::StorageLocation;
use crate::data_types::stage::{StageReport, StageStatus};
use crate::runner::{StageError, ToolCommand};
use crate::stages::StageContext;
use crate::toolkit::GatkLauncher;
use crate::util::progress_bar::get_progress_style;

/// What the per-sample caller emits
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum CallerMode {
    /// Genomic VCF with reference-confidence blocks, the input for joint genotyping
    #[default]
    #[strum(ascii_case_insensitive, serialize = "gvcf")]
    #[clap(name = "gvcf")]
    Gvcf,
    /// Plain single-sample VCF, for inspection only
    #[strum(ascii_case_insensitive, serialize = "vcf")]
    #[clap(name = "vcf")]
    Vcf
}

/// Controls the per-sample caller
#[derive(Builder, Clone, Copy, Debug, Default)]
#[builder(default)]
pub struct CallerConfig {
    /// Output type
    mode: CallerMode,
    /// If true, also write the locally re-assembled reads for each sample
    emit_bamout: bool,
    /// If true, samples with a configured GVCF are called again from their alignments
    recall_existing: bool
}

impl CallerConfig {
    // getters
    pub fn mode(&self) -> CallerMode {
        self.mode
    }

    pub fn emit_bamout(&self) -> bool {
        self.emit_bamout
    }

    pub fn recall_existing(&self) -> bool {
        self.recall_existing
    }
}

/// Builds one HaplotypeCaller invocation.
/// # Arguments
/// * `gatk` - the launcher
/// * `reference` - reference FASTA
/// * `alignments` - the sample's aligned reads
/// * `output` - the VCF or GVCF to write
/// * `intervals` - optional restriction intervals
/// * `mode` - VCF or GVCF output
/// * `bamout` - optional path for the re-assembled reads
pub fn haplotype_caller_command(
    gatk: &GatkLauncher,
    reference: &StorageLocation,
    alignments: &StorageLocation,
    output: &Path,
    intervals: &[GenomicInterval],
    mode: CallerMode,
    bamout: Option<&Path>
) -> ToolCommand {
    gatk.tool("HaplotypeCaller")
        .option("-R", reference)
        .option("-I", alignments)
        .option("-O", output.display())
        .optional("-bamout", bamout.map(|b| b.display()))
        .optional("-ERC", (mode == CallerMode::Gvcf).then_some("GVCF"))
        .repeated("-L", intervals)
}

/// Picks the samples that need calling, paired with their alignments.
/// In GVCF mode, samples that already have a GVCF are skipped unless `recall_existing` is set.
/// # Arguments
/// * `samples` - the cohort samples
/// * `caller_config` - caller settings
/// # Errors
/// * if a sample needs calling but has no alignments
pub fn samples_to_call<'a>(samples: &'a [SampleSpec], caller_config: &CallerConfig) -> anyhow::Result<Vec<(&'a SampleSpec, &'a StorageLocation)>> {
    let mut ret = vec![];
    for sample in samples.iter() {
        let needs_call = match caller_config.mode() {
            CallerMode::Gvcf => sample.gvcf.is_none() || caller_config.recall_existing(),
            CallerMode::Vcf => true
        };
        if !needs_call {
            info!("\t{}: using existing GVCF {}", sample.name, sample.gvcf.as_ref().map(|g| g.to_string()).unwrap_or_default());
            continue;
        }

        match sample.alignments.as_ref() {
            Some(alignments) => ret.push((sample, alignments)),
            None => {
                if sample.gvcf.is_some() {
                    warn!("\t{}: no alignments available, keeping existing GVCF", sample.name);
                } else {
                    anyhow::bail!("Sample {:?} has no alignments to call from", sample.name);
                }
            }
        };
    }
    Ok(ret)
}

/// Runs the per-sample caller for every sample that needs it.
/// Samples are independent, so they are spread across the global rayon thread pool.
/// # Arguments
/// * `ctx` - the stage context
/// * `caller_config` - caller settings
/// * `report` - collects commands and outputs
pub fn call_samples(ctx: &StageContext, caller_config: &CallerConfig, report: &mut StageReport) -> anyhow::Result<()> {
    info!("Selecting samples for calling ({} mode):", caller_config.mode());
    let to_call = samples_to_call(&ctx.config.samples, caller_config)?;
    if to_call.is_empty() {
        info!("All samples already have GVCFs, nothing to call.");
        report.status = StageStatus::Skipped;
        return Ok(());
    }

    let workspace = ctx.workspace;
    let jobs: Vec<(PathBuf, ToolCommand)> = to_call.iter()
        .map(|(sample, alignments)| {
            let output = match caller_config.mode() {
                CallerMode::Gvcf => workspace.sample_gvcf(&sample.name),
                CallerMode::Vcf => workspace.sample_vcf(&sample.name)
            };
            let bamout = if caller_config.emit_bamout() {
                Some(workspace.sample_bamout(&sample.name))
            } else {
                None
            };
            let command = haplotype_caller_command(
                &ctx.gatk, &ctx.config.reference, alignments, &output,
                &ctx.config.intervals, caller_config.mode(), bamout.as_deref()
            );
            report.outputs.push(output.clone());
            if let Some(b) = bamout {
                report.outputs.push(b);
            }
            (output, command)
        })
        .collect();

    // record everything up front, the parallel section cannot touch the report
    report.commands.extend(jobs.iter().map(|(_o, c)| c.to_string()));

    info!("Calling {} sample(s)...", jobs.len());
    let style = get_progress_style();
    let runner = ctx.runner;
    let results: Vec<Result<(), StageError>> = jobs.par_iter()
        .map(|(output, command)| {
            let result = runner.run(command);
            if result.is_ok() {
                info!("Finished {output:?}");
            }
            result
        })
        .progress_with_style(style)
        .collect();

    // report the first failure, in sample order
    for result in results.into_iter() {
        result?;
    }
    Ok(())
}

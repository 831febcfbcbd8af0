
use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::data_types::calling_metrics::DETAIL_METRICS_SUFFIX;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct MetricsSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    jointcall_version: String,

    /// Input detail metrics file (*.variant_calling_detail_metrics)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input-metrics")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub detail_filenames: Vec<PathBuf>,

    /// The callset label for the corresponding input [default: file name without the metrics suffix]
    #[clap(short = 'l')]
    #[clap(long = "label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    pub labels: Vec<String>,

    /// Output summary file (CSV/TSV)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-summary")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_summary_filename: PathBuf,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

/// Default label for a detail metrics file, e.g. "trioGGVCF_metrics.variant_calling_detail_metrics" -> "trioGGVCF"
fn default_label(detail_fn: &Path) -> String {
    let name = detail_fn.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let prefix = name.strip_suffix(DETAIL_METRICS_SUFFIX).unwrap_or(&name);
    prefix.strip_suffix("_metrics").unwrap_or(prefix).to_string()
}

pub fn check_metrics_settings(mut settings: MetricsSettings) -> anyhow::Result<MetricsSettings> {
    // hard code the version in
    settings.jointcall_version = FULL_VERSION.clone();
    info!("Jointcall version: {:?}", &settings.jointcall_version);
    info!("Sub-command: metrics");
    info!("Inputs:");

    ensure!(
        settings.labels.len() <= settings.detail_filenames.len(),
        "More --label values ({}) than input metrics files ({})", settings.labels.len(), settings.detail_filenames.len()
    );
    for (i, detail_fn) in settings.detail_filenames.iter().enumerate() {
        check_required_filename(detail_fn, format!("Input metrics #{i}").as_str())?;
        info!("\tInput metrics #{i}: {detail_fn:?}");

        if settings.labels.len() <= i {
            settings.labels.push(default_label(detail_fn));
        }
        info!("\t\tCallset label: {:?}", settings.labels[i]);
    }

    info!("Outputs:");
    info!("\tSummary: {:?}", &settings.output_summary_filename);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label() {
        assert_eq!(default_label(Path::new("sandbox/trioGGVCF_metrics.variant_calling_detail_metrics")), "trioGGVCF");
        assert_eq!(default_label(Path::new("sandbox/custom.variant_calling_detail_metrics")), "custom");
        assert_eq!(default_label(Path::new("other.txt")), "other.txt");
    }

    #[test]
    fn test_check_metrics_settings() {
        let detail_fn = PathBuf::from("test_data/metrics/trioGGVCF_metrics.variant_calling_detail_metrics");
        let settings = MetricsSettings {
            detail_filenames: vec![detail_fn.clone(), detail_fn.clone()],
            labels: vec!["joint".to_string()],
            output_summary_filename: PathBuf::from("summary.tsv"),
            ..Default::default()
        };
        let settings = check_metrics_settings(settings).unwrap();
        assert_eq!(settings.labels, vec!["joint".to_string(), "trioGGVCF".to_string()]);

        let too_many_labels = MetricsSettings {
            detail_filenames: vec![detail_fn],
            labels: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        assert!(check_metrics_settings(too_many_labels).is_err());
    }
}

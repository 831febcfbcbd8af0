
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct InspectSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    jointcall_version: String,

    /// Input GVCF file, plain or compressed
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input-gvcf")]
    #[clap(value_name = "GVCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub gvcf_filenames: Vec<PathBuf>,

    /// Optional output summary file (JSON)
    #[clap(short = 'o')]
    #[clap(long = "output-json")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_json: Option<PathBuf>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_inspect_settings(mut settings: InspectSettings) -> anyhow::Result<InspectSettings> {
    // hard code the version in
    settings.jointcall_version = FULL_VERSION.clone();
    info!("Jointcall version: {:?}", &settings.jointcall_version);
    info!("Sub-command: inspect");
    info!("Inputs:");
    for (i, gvcf_fn) in settings.gvcf_filenames.iter().enumerate() {
        check_required_filename(gvcf_fn, format!("Input GVCF #{i}").as_str())?;
        info!("\tInput GVCF #{i}: {gvcf_fn:?}");
    }

    info!("Outputs:");
    info!("\tSummary: {:?}", &settings.output_json);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_inspect_settings() {
        let settings = InspectSettings {
            gvcf_filenames: vec![PathBuf::from("test_data/gvcf/mother.g.vcf")],
            ..Default::default()
        };
        let settings = check_inspect_settings(settings).unwrap();
        assert_eq!(settings.jointcall_version, *FULL_VERSION);

        let missing = InspectSettings {
            gvcf_filenames: vec![PathBuf::from("test_data/gvcf/father.g.vcf")],
            ..Default::default()
        };
        assert!(check_inspect_settings(missing).is_err());
    }
}

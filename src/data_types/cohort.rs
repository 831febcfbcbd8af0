
use anyhow::{bail, ensure};
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data_types::interval::GenomicInterval;
use crate::data_types::location::StorageLocation;

/// Default name for the launcher script
pub const DEFAULT_GATK_EXECUTABLE: &str = "gatk";
/// Default name for the object-store client
pub const DEFAULT_STORAGE_EXECUTABLE: &str = "gsutil";
/// Default cohort label, used to name the consolidated store and callsets
pub const DEFAULT_COHORT_NAME: &str = "cohort";

/// A single sample in the cohort
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SampleSpec {
    /// Sample name; must match the SM tag in the alignments and the pedigree ID
    pub name: String,
    /// Aligned reads for the sample (BAM/CRAM); required if no GVCF is provided
    #[serde(default)]
    pub alignments: Option<StorageLocation>,
    /// A pre-called GVCF; if provided, the per-sample caller is skipped for this sample
    #[serde(default)]
    pub gvcf: Option<StorageLocation>
}

/// A copy from a source location into a folder inside the local workspace
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StagingItem {
    /// Remote or local source, may end in a `*` wildcard for remote sources
    pub source: StorageLocation,
    /// Destination folder, relative to the workspace root
    #[serde(default)]
    pub destination: PathBuf
}

/// Shared resource files used by refinement and metrics
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    /// Known variant sites, used by the calling metrics
    #[serde(default)]
    pub dbsnp: Option<StorageLocation>,
    /// Population allele-frequency callsets available to refinement profiles, keyed by label
    #[serde(default)]
    pub population_callsets: indexmap::IndexMap<String, StorageLocation>
}

/// A single genotype refinement configuration
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RefinementProfile {
    /// Label used in the output file name; an empty label produces the base refined callset
    #[serde(default)]
    pub label: String,
    /// If true, the pedigree is used as a prior
    #[serde(default = "default_true")]
    pub use_pedigree: bool,
    /// Labels from `ResourceSpec::population_callsets`; empty means population priors are skipped
    #[serde(default)]
    pub population_callsets: Vec<String>
}

fn default_true() -> bool {
    true
}

/// Launcher settings for the external toolkit
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolkitSpec {
    /// The GATK launcher
    #[serde(default = "default_gatk")]
    pub gatk: String,
    /// The object-store client
    #[serde(default = "default_storage")]
    pub storage_client: String,
    /// Optional JVM options handed to the launcher via `--java-options`
    #[serde(default)]
    pub java_options: Option<String>
}

fn default_gatk() -> String {
    DEFAULT_GATK_EXECUTABLE.to_string()
}

fn default_storage() -> String {
    DEFAULT_STORAGE_EXECUTABLE.to_string()
}

impl Default for ToolkitSpec {
    fn default() -> Self {
        Self {
            gatk: default_gatk(),
            storage_client: default_storage(),
            java_options: None
        }
    }
}

/// The full description of a cohort run, usually loaded from JSON
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CohortConfig {
    /// Label for the cohort, used for the consolidated store and output callsets
    #[serde(default = "default_cohort_name")]
    pub cohort_name: String,
    /// Local workspace root; all stage outputs are written below this
    pub workspace: PathBuf,
    /// Reference FASTA, with its index and dictionary alongside
    pub reference: StorageLocation,
    /// Optional PED file describing family relationships
    #[serde(default)]
    pub pedigree: Option<StorageLocation>,
    /// Intervals to restrict calling, consolidation, and genotyping
    #[serde(default)]
    pub intervals: Vec<GenomicInterval>,
    /// Samples in the cohort, in output order
    pub samples: Vec<SampleSpec>,
    /// Shared resources
    #[serde(default)]
    pub resources: ResourceSpec,
    /// Inputs to copy into the workspace before anything else runs
    #[serde(default)]
    pub staging: Vec<StagingItem>,
    /// Refinement profiles; if empty, a pedigree-only profile is used when a pedigree exists
    #[serde(default)]
    pub refinement: Vec<RefinementProfile>,
    /// Optional remote destination that finished outputs are copied to
    #[serde(default)]
    pub publish: Option<StorageLocation>,
    /// External tool launchers
    #[serde(default)]
    pub toolkit: ToolkitSpec
}

fn default_cohort_name() -> String {
    DEFAULT_COHORT_NAME.to_string()
}

/// Names that end up in workspace file names cannot contain path separators
fn has_path_separator(name: &str) -> bool {
    name.contains(['/', '\\'])
}

impl CohortConfig {
    /// Checks the internal consistency of the configuration.
    /// File existence is checked separately since remote inputs cannot be verified locally.
    /// # Errors
    /// * if the cohort has no samples, or sample names are empty or duplicated
    /// * if a sample has neither alignments nor a GVCF
    /// * if a refinement profile references an unknown population callset or has no priors at all
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.cohort_name.is_empty(), "cohort_name must not be empty");
        ensure!(
            !has_path_separator(&self.cohort_name),
            "cohort_name must not contain path separators: {:?}", self.cohort_name
        );
        ensure!(!self.samples.is_empty(), "cohort must contain at least one sample");

        let mut observed: HashSet<&str> = Default::default();
        for sample in self.samples.iter() {
            ensure!(!sample.name.is_empty(), "sample names must not be empty");
            ensure!(!has_path_separator(&sample.name), "sample name must not contain path separators: {:?}", sample.name);
            if !observed.insert(sample.name.as_str()) {
                bail!("duplicate sample name: {:?}", sample.name);
            }
            ensure!(
                sample.alignments.is_some() || sample.gvcf.is_some(),
                "sample {:?} must provide alignments, a GVCF, or both", sample.name
            );
        }

        let mut labels: HashSet<&str> = Default::default();
        for profile in self.refinement.iter() {
            ensure!(
                !has_path_separator(&profile.label),
                "refinement label must not contain path separators: {:?}", profile.label
            );
            if !labels.insert(profile.label.as_str()) {
                bail!("duplicate refinement label: {:?}", profile.label);
            }
            ensure!(
                profile.use_pedigree || !profile.population_callsets.is_empty(),
                "refinement profile {:?} has no pedigree and no population callsets", profile.label
            );
            if profile.use_pedigree {
                ensure!(self.pedigree.is_some(), "refinement profile {:?} requires a pedigree", profile.label);
            }
            for callset in profile.population_callsets.iter() {
                ensure!(
                    self.resources.population_callsets.contains_key(callset),
                    "refinement profile {:?} references unknown population callset {callset:?}", profile.label
                );
            }
        }

        Ok(())
    }

    /// Returns the refinement profiles to run, filling in the default when none are configured
    pub fn refinement_profiles(&self) -> Vec<RefinementProfile> {
        if !self.refinement.is_empty() {
            self.refinement.clone()
        } else if self.pedigree.is_some() {
            vec![RefinementProfile {
                label: String::new(),
                use_pedigree: true,
                population_callsets: vec![]
            }]
        } else {
            vec![]
        }
    }

    /// Sample names in configuration order
    pub fn sample_names(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::json_io::load_json;

    fn trio_config() -> CohortConfig {
        load_json(&PathBuf::from("test_data/trio/cohort.json")).unwrap()
    }

    #[test]
    fn test_load_config() {
        let config = trio_config();
        assert_eq!(config.cohort_name, "trio");
        assert_eq!(config.sample_names(), vec!["mother", "father", "son"]);
        assert_eq!(config.intervals, vec![GenomicInterval::new("20", 10_000_000, 10_200_000).unwrap()]);
        assert!(config.reference.is_remote());
        assert_eq!(config.toolkit.gatk, "gatk");
        assert_eq!(config.toolkit.storage_client, "gsutil");
        assert_eq!(config.staging.len(), 4);
        assert!(config.samples[0].gvcf.is_none());
        assert!(config.samples[1].gvcf.is_some());
        config.validate().unwrap();

        let profiles = config.refinement_profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].population_callsets, vec!["gnomad".to_string()]);
    }

    #[test]
    fn test_default_refinement() {
        let mut config = trio_config();
        config.refinement.clear();
        let profiles = config.refinement_profiles();
        assert_eq!(profiles.len(), 1);
        assert!(profiles[0].use_pedigree);
        assert!(profiles[0].label.is_empty());

        config.pedigree = None;
        assert!(config.refinement_profiles().is_empty());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = trio_config();
        config.samples[2].name = "mother".to_string();
        assert!(config.validate().is_err());

        let mut config = trio_config();
        config.samples[0].alignments = None;
        assert!(config.validate().is_err());

        let mut config = trio_config();
        config.refinement[1].population_callsets = vec!["exac".to_string()];
        assert!(config.validate().is_err());

        let mut config = trio_config();
        config.pedigree = None;
        assert!(config.validate().is_err());

        let mut config = trio_config();
        config.cohort_name = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_names_stay_in_workspace() {
        let mut config = trio_config();
        config.refinement[1].label = "../escaped".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refinement label"));

        let mut config = trio_config();
        config.refinement[1].label = "gnomad\\v2".to_string();
        assert!(config.validate().is_err());

        let mut config = trio_config();
        config.samples[0].name = "../mother".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields() {
        let text = r#"{"workspace": "/tmp/x", "reference": "ref.fasta", "samples": [], "bogus": 1}"#;
        assert!(serde_json::from_str::<CohortConfig>(text).is_err());
    }
}

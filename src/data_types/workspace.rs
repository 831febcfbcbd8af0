
use anyhow::Context;
use log::debug;
use std::path::{Path, PathBuf};

/// Folder for everything the pipeline produces
pub const SANDBOX_DIR: &str = "sandbox";
/// Folder for the staged reference
pub const REFERENCE_DIR: &str = "ref";
/// Folder for staged resource callsets
pub const RESOURCES_DIR: &str = "resources";
/// Folder for staged pre-called GVCFs
pub const GVCF_DIR: &str = "gvcfs";
/// Name of the run summary file at the workspace root
pub const RUN_SUMMARY_FILENAME: &str = "run_summary.json";
/// Name of the file listing paths for manual inspection
pub const INSPECTION_PATHS_FILENAME: &str = "inspection_paths.txt";

/// Deterministic layout of a local workspace.
/// Every stage derives its inputs and outputs from here, so any subset of stages can be re-run.
#[derive(Clone, Debug)]
pub struct Workspace {
    /// Root folder
    root: PathBuf,
    /// Cohort label used to name cohort-level outputs
    cohort_name: String
}

impl Workspace {
    /// Constructor
    pub fn new(root: PathBuf, cohort_name: &str) -> Self {
        Self {
            root,
            cohort_name: cohort_name.to_string()
        }
    }

    /// The folders that `create_directories` makes
    pub fn directories(&self) -> Vec<PathBuf> {
        [SANDBOX_DIR, REFERENCE_DIR, RESOURCES_DIR, GVCF_DIR].iter()
            .map(|d| self.root.join(d))
            .collect()
    }

    /// Creates all workspace folders, succeeding if they already exist
    pub fn create_directories(&self) -> anyhow::Result<()> {
        for folder in self.directories() {
            debug!("Creating {folder:?}...");
            std::fs::create_dir_all(&folder)
                .with_context(|| format!("Error while creating {folder:?}:"))?;
        }
        Ok(())
    }

    /// Output GVCF from the per-sample caller
    pub fn sample_gvcf(&self, sample: &str) -> PathBuf {
        self.sandbox().join(format!("{sample}.g.vcf.gz"))
    }

    /// Output VCF from the per-sample caller in plain VCF mode
    pub fn sample_vcf(&self, sample: &str) -> PathBuf {
        self.sandbox().join(format!("{sample}HC.vcf"))
    }

    /// Realigned debug reads from the per-sample caller
    pub fn sample_bamout(&self, sample: &str) -> PathBuf {
        self.sandbox().join(format!("{sample}HCdebug.bam"))
    }

    /// Consolidated cohort store
    pub fn cohort_store(&self) -> PathBuf {
        self.sandbox().join(&self.cohort_name)
    }

    /// Joint genotyped callset
    pub fn joint_callset(&self) -> PathBuf {
        self.sandbox().join(format!("{}GGVCF.vcf", self.cohort_name))
    }

    /// Multi-sample GVCF exported from the cohort store
    pub fn exported_store(&self) -> PathBuf {
        self.sandbox().join(format!("{}_selectvariants.g.vcf", self.cohort_name))
    }

    /// Refined callset for a given profile label; an empty label is the base refined callset
    pub fn refined_callset(&self, label: &str) -> PathBuf {
        if label.is_empty() {
            self.sandbox().join(format!("{}CGP.vcf", self.cohort_name))
        } else {
            self.sandbox().join(format!("{}CGP_{label}.vcf", self.cohort_name))
        }
    }

    /// Output prefix handed to the metrics collector for a callset
    pub fn metrics_prefix(&self, callset: &Path) -> PathBuf {
        let stem = callset_label(callset);
        self.sandbox().join(format!("{stem}_metrics"))
    }

    /// Combined metrics table across callsets
    pub fn metrics_summary(&self) -> PathBuf {
        self.sandbox().join(format!("{}_metrics_summary.tsv", self.cohort_name))
    }

    /// Run summary written after every run
    pub fn run_summary(&self) -> PathBuf {
        self.root.join(RUN_SUMMARY_FILENAME)
    }

    /// Paths a reader should open for manual inspection
    pub fn inspection_paths(&self) -> PathBuf {
        self.sandbox().join(INSPECTION_PATHS_FILENAME)
    }

    // getters
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sandbox(&self) -> PathBuf {
        self.root.join(SANDBOX_DIR)
    }

    pub fn cohort_name(&self) -> &str {
        &self.cohort_name
    }
}

/// Label for a callset file: the file name with VCF extensions removed
/// # Arguments
/// * `callset` - a VCF path, e.g. "sandbox/trioCGP.vcf.gz"
pub fn callset_label(callset: &Path) -> String {
    let name = callset.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    for suffix in [".g.vcf.gz", ".vcf.gz", ".g.vcf", ".vcf", ".bcf"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            return stem.to_string();
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let workspace = Workspace::new(PathBuf::from("/home/jupyter-user/2-germline-vd"), "trio");
        assert_eq!(workspace.sample_gvcf("mother"), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/mother.g.vcf.gz"));
        assert_eq!(workspace.sample_vcf("mother"), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/motherHC.vcf"));
        assert_eq!(workspace.sample_bamout("mother"), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/motherHCdebug.bam"));
        assert_eq!(workspace.cohort_store(), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/trio"));
        assert_eq!(workspace.joint_callset(), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/trioGGVCF.vcf"));
        assert_eq!(workspace.refined_callset(""), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/trioCGP.vcf"));
        assert_eq!(workspace.refined_callset("gnomad"), PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/trioCGP_gnomad.vcf"));
        assert_eq!(
            workspace.metrics_prefix(&workspace.joint_callset()),
            PathBuf::from("/home/jupyter-user/2-germline-vd/sandbox/trioGGVCF_metrics")
        );
        assert_eq!(workspace.run_summary(), PathBuf::from("/home/jupyter-user/2-germline-vd/run_summary.json"));
    }

    #[test]
    fn test_callset_label() {
        assert_eq!(callset_label(Path::new("a/trioCGP.vcf")), "trioCGP");
        assert_eq!(callset_label(Path::new("a/mother.g.vcf.gz")), "mother");
        assert_eq!(callset_label(Path::new("a/trio.bcf")), "trio");
        assert_eq!(callset_label(Path::new("a/notes.txt")), "notes.txt");
    }

    #[test]
    fn test_create_directories() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(temp.path().join("ws"), "trio");
        workspace.create_directories().unwrap();
        for folder in workspace.directories() {
            assert!(folder.is_dir());
        }
        // idempotent, like mkdir -p
        workspace.create_directories().unwrap();
    }
}

/*!
# Stages module
One sub-module per pipeline stage.
Each stage builds its external commands from the cohort configuration and the workspace layout, then hands them to the runner.
*/
/// Per-sample variant calling
pub mod caller;
/// Consolidation of per-sample GVCFs into a cohort store
pub mod consolidator;
/// Joint genotyping from the cohort store
pub mod genotyper;
/// Calling metrics over each callset
pub mod metrics;
/// Copies outputs and reports paths for manual inspection
pub mod publisher;
/// Genotype refinement using pedigree and population priors
pub mod refiner;
/// Workspace creation and input staging
pub mod stager;

use crate::data_types::cohort::CohortConfig;
use crate::data_types::stage::StageReport;
use crate::data_types::workspace::Workspace;
use crate::runner::{CommandRunner, StageError, ToolCommand};
use crate::toolkit::{GatkLauncher, StorageClient};

/// Everything a stage needs to build and run its commands
pub struct StageContext<'a> {
    /// The cohort being processed
    pub config: &'a CohortConfig,
    /// Workspace layout for all outputs
    pub workspace: &'a Workspace,
    /// Executes (or records) external commands
    pub runner: &'a dyn CommandRunner,
    /// GATK launcher
    pub gatk: GatkLauncher,
    /// Object-store client
    pub storage: StorageClient
}

impl<'a> StageContext<'a> {
    /// Constructor, builds the launchers from the cohort toolkit settings
    pub fn new(config: &'a CohortConfig, workspace: &'a Workspace, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            workspace,
            runner,
            gatk: GatkLauncher::from(&config.toolkit),
            storage: StorageClient::from(&config.toolkit)
        }
    }

    /// Shortcut for the runner's dry-run state
    pub fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// Records a command in the report and runs it
    /// # Arguments
    /// * `report` - the report for the current stage
    /// * `command` - the command to run
    pub fn execute(&self, report: &mut StageReport, command: &ToolCommand) -> Result<(), StageError> {
        report.commands.push(command.to_string());
        self.runner.run(command)
    }
}

/// Renders a local folder as a copy destination with exactly one trailing '/'
pub fn folder_destination(folder: &std::path::Path) -> String {
    let rendered = folder.display().to_string();
    format!("{}/", rendered.trim_end_matches('/'))
}

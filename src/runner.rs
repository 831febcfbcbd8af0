/*!
# Runner module
Everything the pipeline does to the outside world goes through a `ToolCommand` handed to a `CommandRunner`.
The `ProcessRunner` actually spawns the external tools, while the `DryRunRunner` only records what would have been run.
*/
use itertools::Itertools;
use log::{debug, info};
use std::process::Command;
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error
    },
    /// `code` is None when the child was terminated by a signal
    #[error("command exited with status {code:?}: {command}")]
    ExitStatus { code: Option<i32>, command: String }
}

/// A fully specified external invocation: program name and argument vector
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolCommand {
    /// The executable, resolved through PATH
    program: String,
    /// Ordered arguments
    args: Vec<String>
}

impl ToolCommand {
    /// Constructor
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![]
        }
    }

    /// Appends a single argument
    pub fn arg<S: ToString>(mut self, value: S) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Appends a flag followed by its value, e.g. `-O out.vcf`
    pub fn option<S: ToString>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    /// Appends the flag once per value, e.g. `-V a.g.vcf -V b.g.vcf`
    pub fn repeated<S: ToString>(mut self, flag: &str, values: impl IntoIterator<Item = S>) -> Self {
        for value in values {
            self = self.option(flag, value);
        }
        self
    }

    /// Appends a flag followed by its value, but only if the value is present
    pub fn optional<S: ToString>(self, flag: &str, value: Option<S>) -> Self {
        match value {
            Some(v) => self.option(flag, v),
            None => self
        }
    }

    /// Appends a boolean switch if `enabled` is true
    pub fn switch(self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }

    /// Returns true if the exact argument appears in this command
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }

    /// Returns every value that directly follows `flag`
    pub fn values_for(&self, flag: &str) -> Vec<&str> {
        self.args.iter()
            .tuple_windows()
            .filter(|(f, _v)| f.as_str() == flag)
            .map(|(_f, v)| v.as_str())
            .collect()
    }

    // getters
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Quotes a single shell word if it contains anything outside a safe set
fn shell_quote(word: &str) -> String {
    let is_safe = !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=,@+%".contains(c));
    if is_safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .map(shell_quote)
            .join(" ");
        write!(f, "{rendered}")
    }
}

/// Anything that can execute a `ToolCommand`
pub trait CommandRunner: Sync {
    /// Runs the command to completion.
    /// # Errors
    /// * if the command cannot be launched or exits unsuccessfully
    fn run(&self, command: &ToolCommand) -> Result<(), StageError>;

    /// If true, nothing is executed and the filesystem should not be modified
    fn is_dry_run(&self) -> bool;
}

/// Spawns each command as a child process and waits for it.
/// Child output is passed straight through to our stdout/stderr.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand) -> Result<(), StageError> {
        info!("Running: {command}");
        let status = Command::new(command.program())
            .args(command.args())
            .status()
            .map_err(|source| StageError::Spawn {
                program: command.program().to_string(),
                source
            })?;

        if status.success() {
            debug!("Finished: {}", command.program());
            Ok(())
        } else {
            Err(StageError::ExitStatus {
                code: status.code(),
                command: command.to_string()
            })
        }
    }

    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Records commands instead of running them
#[derive(Debug, Default)]
pub struct DryRunRunner {
    /// Everything we were asked to run, in order
    commands: Mutex<Vec<ToolCommand>>
}

impl DryRunRunner {
    /// Returns a copy of the recorded commands
    pub fn commands(&self) -> Vec<ToolCommand> {
        match self.commands.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone()
        }
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, command: &ToolCommand) -> Result<(), StageError> {
        info!("[dry-run] {command}");
        let mut guard = match self.commands.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner()
        };
        guard.push(command.clone());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

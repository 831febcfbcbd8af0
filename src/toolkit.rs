
use crate::data_types::cohort::ToolkitSpec;
use crate::data_types::location::StorageLocation;
use crate::runner::ToolCommand;

/// Builds invocations of the GATK launcher
#[derive(Clone, Debug)]
pub struct GatkLauncher {
    /// Launcher executable
    executable: String,
    /// Optional JVM options
    java_options: Option<String>
}

impl GatkLauncher {
    /// Constructor
    pub fn new(executable: &str, java_options: Option<String>) -> Self {
        Self {
            executable: executable.to_string(),
            java_options
        }
    }

    /// Starts a command for the given tool; `--java-options` must precede the tool name
    /// # Arguments
    /// * `tool_name` - the GATK tool, e.g. "HaplotypeCaller"
    pub fn tool(&self, tool_name: &str) -> ToolCommand {
        ToolCommand::new(&self.executable)
            .optional("--java-options", self.java_options.as_deref())
            .arg(tool_name)
    }
}

impl From<&ToolkitSpec> for GatkLauncher {
    fn from(value: &ToolkitSpec) -> Self {
        Self::new(&value.gatk, value.java_options.clone())
    }
}

/// Builds invocations of the object-store client
#[derive(Clone, Debug)]
pub struct StorageClient {
    /// Client executable
    executable: String
}

impl StorageClient {
    /// Constructor
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string()
        }
    }

    /// Lists a remote prefix or pattern; a non-zero exit means it is not accessible
    pub fn list(&self, location: &StorageLocation) -> ToolCommand {
        ToolCommand::new(&self.executable)
            .arg("ls")
            .arg(location.as_arg())
    }

    /// Copies one or more sources into a destination.
    /// # Arguments
    /// * `sources` - files or patterns to copy
    /// * `destination` - target; folders should end with '/' so a single source is not renamed
    pub fn copy<'a>(&self, sources: impl IntoIterator<Item = &'a StorageLocation>, destination: &str) -> ToolCommand {
        let mut command = ToolCommand::new(&self.executable).arg("cp");
        for source in sources {
            command = command.arg(source.as_arg());
        }
        command.arg(destination)
    }
}

impl From<&ToolkitSpec> for StorageClient {
    fn from(value: &ToolkitSpec) -> Self {
        Self::new(&value.storage_client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gatk_launcher() {
        let launcher = GatkLauncher::new("gatk", None);
        assert_eq!(launcher.tool("GenotypeGVCFs").to_string(), "gatk GenotypeGVCFs");

        let launcher = GatkLauncher::from(&ToolkitSpec {
            gatk: "/opt/gatk/gatk".to_string(),
            storage_client: "gsutil".to_string(),
            java_options: Some("-Xmx8g".to_string())
        });
        assert_eq!(launcher.tool("HaplotypeCaller").to_string(), "/opt/gatk/gatk --java-options -Xmx8g HaplotypeCaller");
    }

    #[test]
    fn test_storage_client() {
        let client = StorageClient::new("gsutil");
        let source: StorageLocation = "gs://gatk-tutorials/workshop_1910/2-germline/ref/*".parse().unwrap();
        assert_eq!(client.list(&source).to_string(), "gsutil ls 'gs://gatk-tutorials/workshop_1910/2-germline/ref/*'");
        assert_eq!(
            client.copy([&source], "/home/jupyter-user/2-germline-vd/ref/").to_string(),
            "gsutil cp 'gs://gatk-tutorials/workshop_1910/2-germline/ref/*' /home/jupyter-user/2-germline-vd/ref/"
        );
    }
}


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// URI scheme prefixes that we hand off to the object-store client
pub const REMOTE_SCHEMES: [&str; 1] = ["gs://"];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LocationError {
    #[error("location is empty")]
    Empty,
    #[error("remote location is missing a bucket: {0:?}")]
    MissingBucket(String)
}

/// Where a file lives: in remote object storage or on the local filesystem.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StorageLocation {
    /// A full object-store URI, e.g. `gs://bucket/path/ref.fasta`
    Remote(String),
    /// A local file or folder
    Local(PathBuf)
}

impl StorageLocation {
    /// Returns true if this location requires the object-store client
    pub fn is_remote(&self) -> bool {
        matches!(self, StorageLocation::Remote(_))
    }

    /// Returns true if the location is a wildcard pattern, e.g. `gs://bucket/ref/*`
    pub fn is_pattern(&self) -> bool {
        self.to_string().contains('*')
    }

    /// Appends a child component to this location.
    /// # Arguments
    /// * `child` - the file or folder name to append
    pub fn join(&self, child: &str) -> Self {
        match self {
            StorageLocation::Remote(uri) => {
                let base = uri.trim_end_matches('/');
                StorageLocation::Remote(format!("{base}/{child}"))
            },
            StorageLocation::Local(path) => StorageLocation::Local(path.join(child))
        }
    }

    /// Returns the local path, if this is a local location
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            StorageLocation::Remote(_) => None,
            StorageLocation::Local(path) => Some(path)
        }
    }

    /// The value handed to external tools on the command line
    pub fn as_arg(&self) -> String {
        self.to_string()
    }
}

impl FromStr for StorageLocation {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocationError::Empty);
        }

        for scheme in REMOTE_SCHEMES.iter() {
            if let Some(rest) = s.strip_prefix(scheme) {
                if rest.is_empty() || rest.starts_with('/') {
                    return Err(LocationError::MissingBucket(s.to_string()));
                }
                return Ok(StorageLocation::Remote(s.to_string()));
            }
        }

        Ok(StorageLocation::Local(PathBuf::from(s)))
    }
}

impl From<PathBuf> for StorageLocation {
    fn from(value: PathBuf) -> Self {
        StorageLocation::Local(value)
    }
}

impl TryFrom<String> for StorageLocation {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StorageLocation> for String {
    fn from(value: StorageLocation) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageLocation::Remote(uri) => write!(f, "{uri}"),
            StorageLocation::Local(path) => write!(f, "{}", path.display())
        }
    }
}

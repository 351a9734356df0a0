use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Destination for a backup upload (`name:path`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteTarget {
    /// Remote name as configured in the transfer tool.
    pub remote_name: String,
    /// Directory on the remote; empty for the remote root.
    pub remote_path: String,
}

impl RemoteTarget {
    /// Construct a target, trimming slashes around the path.
    #[must_use]
    pub fn new(remote_name: impl Into<String>, remote_path: impl AsRef<str>) -> Self {
        Self {
            remote_name: remote_name.into(),
            remote_path: remote_path.as_ref().trim_matches('/').to_string(),
        }
    }

    /// Reference for `file_name` uploaded into this target.
    #[must_use]
    pub fn object(&self, file_name: impl Into<String>) -> RemoteRef {
        RemoteRef {
            remote_name: self.remote_name.clone(),
            remote_path: self.remote_path.clone(),
            file_name: file_name.into(),
        }
    }
}

impl Display for RemoteTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote_name, self.remote_path)
    }
}

impl FromStr for RemoteTarget {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let Some((name, path)) = trimmed.split_once(':') else {
            return Err(ModelError::InvalidRemote {
                value: value.to_string(),
                reason: "expected name:path",
            });
        };
        if name.is_empty() {
            return Err(ModelError::InvalidRemote {
                value: value.to_string(),
                reason: "remote name is empty",
            });
        }
        Ok(Self::new(name, path))
    }
}

/// Handle identifying a backed-up copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRef {
    /// Remote name.
    pub remote_name: String,
    /// Directory on the remote.
    pub remote_path: String,
    /// File name of the uploaded object.
    pub file_name: String,
}

impl RemoteRef {
    /// Object path relative to the remote root.
    #[must_use]
    pub fn object_path(&self) -> String {
        if self.remote_path.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.remote_path, self.file_name)
        }
    }

    /// Target directory the object lives in.
    #[must_use]
    pub fn target(&self) -> RemoteTarget {
        RemoteTarget::new(self.remote_name.clone(), &self.remote_path)
    }
}

impl Display for RemoteRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote_name, self.object_path())
    }
}

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Deduplication key for a physical file.
///
/// Identity is the canonical absolute path. A file renamed while a run is in
/// flight therefore gets a fresh identity; the content hash recorded in the
/// transaction record is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentity(PathBuf);

impl FileIdentity {
    /// Derive the identity for `path`.
    ///
    /// Symlinks and `..` components are resolved when the file exists; a
    /// missing file falls back to the lexically absolute path.
    ///
    /// # Errors
    ///
    /// Returns an error when the current directory cannot be determined for a
    /// relative path.
    pub fn resolve(path: &Path) -> io::Result<Self> {
        match path.canonicalize() {
            Ok(canonical) => Ok(Self(canonical)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                std::path::absolute(path).map(Self)
            }
            Err(err) => Err(err),
        }
    }

    /// Path backing the identity.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Display for FileIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.display(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_paths_share_identity() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("photo.jpg");
        std::fs::write(&file, b"jpeg")?;
        std::fs::create_dir(dir.path().join("nested"))?;

        let direct = FileIdentity::resolve(&file)?;
        let dotted = FileIdentity::resolve(&dir.path().join("nested/../photo.jpg"))?;
        assert_eq!(direct, dotted);
        assert!(direct.as_path().is_absolute());
        Ok(())
    }

    #[test]
    fn missing_files_resolve_lexically() -> io::Result<()> {
        let identity = FileIdentity::resolve(Path::new("does-not-exist.png"))?;
        assert!(identity.as_path().is_absolute());
        assert!(identity.to_string().ends_with("does-not-exist.png"));
        Ok(())
    }
}

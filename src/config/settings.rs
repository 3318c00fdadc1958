//! Configuration paths.
//!
//! Locates the XDG-compliant configuration directory and the policy file
//! the command-line front end reads by default.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/guarddial)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the configuration directory. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "guarddial", "guarddial")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the default policy file.
    pub fn policy_file(&self) -> PathBuf {
        self.config_dir.join("policy.json")
    }

    /// The default policy file, if one exists.
    pub fn existing_policy_file(&self) -> Option<PathBuf> {
        let file = self.policy_file();
        file.is_file().then_some(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_file_location() {
        let paths = Paths {
            config_dir: PathBuf::from("/tmp/guarddial-config"),
        };
        assert_eq!(
            paths.policy_file(),
            PathBuf::from("/tmp/guarddial-config/policy.json")
        );
    }

    #[test]
    fn test_existing_policy_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        assert!(paths.existing_policy_file().is_none());

        std::fs::write(paths.policy_file(), "{}").unwrap();
        assert_eq!(paths.existing_policy_file(), Some(paths.policy_file()));
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Pattern for device nodes, e.g. `/dev/hidraw*`
///
/// Only a single trailing `*` in the final path component is supported,
/// which is all device node families need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGlob {
    dir: PathBuf,
    prefix: String,
}

impl DeviceGlob {
    pub fn parse(pattern: &str) -> Result<Self, DeviceGlobError> {
        let (dir, name) = pattern
            .rsplit_once('/')
            .ok_or_else(|| DeviceGlobError::NotAbsolute {
                pattern: pattern.to_string(),
            })?;
        if !pattern.starts_with('/') {
            return Err(DeviceGlobError::NotAbsolute {
                pattern: pattern.to_string(),
            });
        }
        let prefix = name
            .strip_suffix('*')
            .ok_or_else(|| DeviceGlobError::Unsupported {
                pattern: pattern.to_string(),
            })?;
        if prefix.is_empty() || prefix.contains(['*', '?', '[']) || dir.contains(['*', '?', '[']) {
            return Err(DeviceGlobError::Unsupported {
                pattern: pattern.to_string(),
            });
        }
        let dir = if dir.is_empty() { "/" } else { dir };
        Ok(Self {
            dir: PathBuf::from(dir),
            prefix: prefix.to_string(),
        })
    }

    pub fn default_hidraw() -> Self {
        Self {
            dir: PathBuf::from("/dev"),
            prefix: "hidraw".to_string(),
        }
    }

    /// Directory the matching nodes live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matches_name(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix)
    }
}

impl fmt::Display for DeviceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}*", self.dir.display().to_string().trim_end_matches('/'), self.prefix)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceGlobError {
    #[error("device pattern must be an absolute path: {pattern}")]
    NotAbsolute { pattern: String },

    #[error("device pattern must end in a single '*' wildcard: {pattern}")]
    Unsupported { pattern: String },
}

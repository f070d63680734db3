use std::fmt;

use thiserror::Error;

/// Name of a Debian package
///
/// Validated at construction so a name can never be mistaken for an
/// `apt-get` option or carry shell metacharacters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageName(String);

impl PackageName {
    pub const MIN_LENGTH: usize = 2;

    pub fn new(name: &str) -> Result<Self, PackageNameError> {
        if name.len() < Self::MIN_LENGTH {
            return Err(PackageNameError::TooShort);
        }
        let mut chars = name.chars();
        if !chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(PackageNameError::InvalidStart {
                name: name.to_string(),
            });
        }
        if let Some(bad) = chars.find(|c| {
            !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        }) {
            return Err(PackageNameError::InvalidCharacter {
                name: name.to_string(),
                character: bad,
            });
        }
        Ok(Self(name.to_string()))
    }

    /// For compile-time constants; covered by the config tests
    pub(crate) fn known(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a list of names, failing on the first invalid one
    pub fn parse_all(names: &[&str]) -> Result<Vec<Self>, PackageNameError> {
        names.iter().map(|name| Self::new(name)).collect()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageNameError {
    #[error("package name must be at least {min} characters", min = PackageName::MIN_LENGTH)]
    TooShort,

    #[error("package name '{name}' must start with a lowercase letter or digit")]
    InvalidStart { name: String },

    #[error("package name '{name}' contains invalid character '{character}'")]
    InvalidCharacter { name: String, character: char },
}

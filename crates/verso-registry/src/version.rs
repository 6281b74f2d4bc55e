//! Versions and the version bundle
//!
//! A [`VersionBundle`] lists versions newest first. Each [`Version`] carries
//! the changes that describe how the previous (older) version differed from
//! it; the oldest version therefore carries none.

use crate::error::BundleError;
use crate::instruction::Instruction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Value of the synthetic version that carries the bundle's head changes
pub const HEAD_VERSION: &str = "head";

/// Directory name for a version value
///
/// `v` followed by the value with every non-alphanumeric character replaced by
/// `_`: `2024-01-01` becomes `v2024_01_01`.
#[must_use]
pub fn version_dir_name(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("v{sanitized}")
}

/// Named group of instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
    /// Human-readable name, quoted in every error the change causes
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Instructions in application order
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl VersionChange {
    /// Create change
    #[must_use]
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions,
        }
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Single version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Date or tag
    pub value: String,
    /// Changes leading to the previous version
    #[serde(default)]
    pub changes: Vec<VersionChange>,
}

impl Version {
    /// Create version
    #[must_use]
    pub fn new(value: impl Into<String>, changes: Vec<VersionChange>) -> Self {
        Self {
            value: value.into(),
            changes,
        }
    }

    /// Synthetic head version
    #[must_use]
    pub fn head(changes: Vec<VersionChange>) -> Self {
        Self::new(HEAD_VERSION, changes)
    }

    /// Whether this is the synthetic head version
    #[inline]
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.value == HEAD_VERSION
    }

    /// Output directory name
    #[inline]
    #[must_use]
    pub fn dir_name(&self) -> String {
        version_dir_name(&self.value)
    }

    /// Iterate over `(change name, instruction)` pairs in order
    pub fn instructions(&self) -> impl Iterator<Item = (&str, &Instruction)> {
        self.changes.iter().flat_map(|change| {
            change
                .instructions
                .iter()
                .map(move |instruction| (change.name.as_str(), instruction))
        })
    }
}

#[derive(Deserialize)]
struct RawVersionBundle {
    #[serde(default)]
    head_changes: Vec<VersionChange>,
    versions: Vec<Version>,
}

/// Ordered collection of versions, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVersionBundle")]
pub struct VersionBundle {
    head_changes: Vec<VersionChange>,
    versions: Vec<Version>,
}

impl TryFrom<RawVersionBundle> for VersionBundle {
    type Error = BundleError;

    fn try_from(raw: RawVersionBundle) -> Result<Self, Self::Error> {
        Self::new(raw.head_changes, raw.versions)
    }
}

impl VersionBundle {
    /// Create and validate a bundle
    ///
    /// # Errors
    /// Fails when the bundle is empty, declares a value or directory twice,
    /// gives the oldest version changes, or lists dates out of order.
    pub fn new(head_changes: Vec<VersionChange>, versions: Vec<Version>) -> Result<Self, BundleError> {
        let Some(oldest) = versions.last() else {
            return Err(BundleError::Empty);
        };
        if !oldest.changes.is_empty() {
            return Err(BundleError::OldestHasChanges(oldest.value.clone()));
        }

        let mut directories: BTreeMap<String, &str> = BTreeMap::new();
        for version in &versions {
            if let Some(first) = directories.insert(version.dir_name(), &version.value) {
                return Err(if first == version.value {
                    BundleError::DuplicateVersion(version.value.clone())
                } else {
                    BundleError::DuplicateDirectory {
                        first: first.to_string(),
                        second: version.value.clone(),
                        directory: version.dir_name(),
                    }
                });
            }
        }

        let dates: Option<Vec<NaiveDate>> = versions
            .iter()
            .map(|v| NaiveDate::parse_from_str(&v.value, "%Y-%m-%d").ok())
            .collect();
        if let Some(dates) = dates {
            for (pair, values) in dates.windows(2).zip(versions.windows(2)) {
                if pair[0] <= pair[1] {
                    return Err(BundleError::NotChronological {
                        newer: values[0].value.clone(),
                        older: values[1].value.clone(),
                    });
                }
            }
        }

        Ok(Self {
            head_changes,
            versions,
        })
    }

    /// Load a bundle file, choosing the format by extension
    ///
    /// # Errors
    /// Fails on unreadable files, unknown extensions, malformed content or
    /// an invalid bundle.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> Result<Self, BundleError> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("yaml" | "yml") => Self::from_yaml_str,
            Some("json") => Self::from_json_str,
            _ => return Err(BundleError::UnsupportedFormat(path.to_path_buf())),
        };
        let text = std::fs::read_to_string(path).map_err(|e| BundleError::io_error(path, e))?;
        parse(&text)
    }

    /// Parse a TOML bundle
    ///
    /// # Errors
    /// Fails on malformed TOML or an invalid bundle.
    pub fn from_toml_str(text: &str) -> Result<Self, BundleError> {
        toml::from_str(text).map_err(|e| BundleError::format("toml", e))
    }

    /// Parse a YAML bundle
    ///
    /// # Errors
    /// Fails on malformed YAML or an invalid bundle.
    pub fn from_yaml_str(text: &str) -> Result<Self, BundleError> {
        serde_yaml::from_str(text).map_err(|e| BundleError::format("yaml", e))
    }

    /// Parse a JSON bundle
    ///
    /// # Errors
    /// Fails on malformed JSON or an invalid bundle.
    pub fn from_json_str(text: &str) -> Result<Self, BundleError> {
        serde_json::from_str(text).map_err(|e| BundleError::format("json", e))
    }

    /// Versions, newest first
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Changes applied before the newest version is generated
    #[inline]
    #[must_use]
    pub fn head_changes(&self) -> &[VersionChange] {
        &self.head_changes
    }

    /// Synthetic version carrying the head changes
    #[must_use]
    pub fn head_version(&self) -> Version {
        Version::head(self.head_changes.clone())
    }

    /// Newest declared version
    #[must_use]
    pub fn newest(&self) -> &Version {
        // validated non-empty
        &self.versions[0]
    }

    /// Number of declared versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always false for a validated bundle
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterate over versions, newest first
    pub fn iter(&self) -> std::slice::Iter<'_, Version> {
        self.versions.iter()
    }
}

impl<'a> IntoIterator for &'a VersionBundle {
    type Item = &'a Version;
    type IntoIter = std::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

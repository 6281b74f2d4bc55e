//! Generation configuration
//!
//! Loadable from TOML. Every field has a default, so an empty file is a valid
//! configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base class names (last dotted segment) that mark schemas
    pub schema_bases: Vec<String>,
    /// Base class names (last dotted segment) that mark enums
    pub enum_bases: Vec<String>,
    /// Extension of source files, without the dot
    pub source_extension: String,
    /// Directory names never traversed or mirrored
    pub excluded_dirs: Vec<String>,
    /// Parent directory of the version packages; defaults to the canonical
    /// package's parent
    pub output_root: Option<PathBuf>,
    /// Remove an existing version directory before writing it
    pub clean_output: bool,
    /// Maximum number of parsed modules kept in the parse cache
    pub cache_capacity: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            schema_bases: vec!["BaseModel".to_string()],
            enum_bases: vec!["Enum".to_string(), "StrEnum".to_string(), "IntEnum".to_string()],
            source_extension: "py".to_string(),
            excluded_dirs: vec!["__pycache__".to_string()],
            output_root: None,
            clean_output: true,
            cache_capacity: 10_000,
        }
    }
}

impl GenerationConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Fails on malformed TOML or inconsistent values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Fails when the file cannot be read or does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value consistency
    ///
    /// # Errors
    /// Fails on an empty source extension, a zero cache capacity or a class
    /// name listed as both schema and enum base.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_extension.is_empty() || self.source_extension.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "source_extension must be a bare extension, got '{}'",
                self.source_extension
            )));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be positive".to_string()));
        }
        if let Some(shared) = self.schema_bases.iter().find(|b| self.enum_bases.contains(b)) {
            return Err(ConfigError::Invalid(format!(
                "'{shared}' is listed as both a schema and an enum base"
            )));
        }
        Ok(())
    }

    /// Whether a directory name is excluded from traversal
    #[inline]
    #[must_use]
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == dir_name)
    }

    /// Whether a file is a source file
    #[must_use]
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.source_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(GenerationConfig::from_toml_str("").unwrap(), GenerationConfig::default());
    }

    #[test]
    fn overrides_selected_fields() {
        let config = GenerationConfig::from_toml_str(
            "schema_bases = [\"BaseModel\", \"Schema\"]\nclean_output = false\noutput_root = \"out\"\n",
        )
        .unwrap();
        assert_eq!(config.schema_bases, vec!["BaseModel", "Schema"]);
        assert!(!config.clean_output);
        assert_eq!(config.output_root, Some(PathBuf::from("out")));
        assert_eq!(config.source_extension, "py");
    }

    #[test]
    fn rejects_inconsistent_values() {
        assert!(matches!(
            GenerationConfig::from_toml_str("cache_capacity = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GenerationConfig::from_toml_str("enum_bases = [\"BaseModel\"]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GenerationConfig::from_toml_str("clean_output = \"yes\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn classifies_paths() {
        let config = GenerationConfig::default();
        assert!(config.is_source(Path::new("pkg/users.py")));
        assert!(!config.is_source(Path::new("pkg/data.json")));
        assert!(config.is_excluded("__pycache__"));
    }
}

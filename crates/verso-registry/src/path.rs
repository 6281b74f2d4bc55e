//! Dotted Python paths
//!
//! [`ModulePath`] addresses both modules (`pkg.head.users`) and the classes
//! defined in them (`pkg.head.users.Widget`).

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Dotted path to a module or to a name inside a module
///
/// # Examples
/// - `["pkg", "head", "users"]` → `pkg.head.users`
/// - `["pkg", "head", "users", "Widget"]` → `pkg.head.users.Widget`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty path
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Extend with multiple segments
    #[must_use]
    pub fn extend(&self, segments: &[impl AsRef<str>]) -> Self {
        let mut new = self.clone();
        new.0.extend(segments.iter().map(|s| s.as_ref().to_string()));
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Copy of the path with the segment at `index` replaced
    ///
    /// Out-of-range indices return the path unchanged.
    #[must_use]
    pub fn with_segment(&self, index: usize, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        if let Some(slot) = new.0.get_mut(index) {
            *slot = segment.into();
        }
        new
    }

    /// Resolve the module text of a `from ... import` found in this module
    ///
    /// `is_package` tells whether this module is a package initializer, in
    /// which case a single leading dot refers to the package itself.
    ///
    /// # Errors
    /// Fails when the relative import climbs above the top-level package or
    /// the module text is malformed.
    pub fn resolve_import(&self, is_package: bool, module_text: &str) -> Result<Self, PathError> {
        let level = module_text.chars().take_while(|c| *c == '.').count();
        let rest = &module_text[level..];
        if level == 0 {
            return rest.parse();
        }

        let package_len = if is_package { self.0.len() } else { self.0.len().saturating_sub(1) };
        let keep = (package_len + 1).checked_sub(level).filter(|keep| *keep > 0).ok_or_else(|| {
            PathError::BeyondTopLevel {
                module: self.to_string(),
                import: module_text.to_string(),
            }
        })?;

        let base = Self(self.0[..keep].to_vec());
        if rest.is_empty() {
            Ok(base)
        } else {
            let tail: Self = rest.parse()?;
            Ok(base.extend(tail.segments()))
        }
    }

    /// Iterator over segments
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for ModulePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for ModulePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else if seg.contains(|c: char| !c.is_alphanumeric() && c != '_') {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl TryFrom<String> for ModulePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModulePath> for String {
    fn from(path: ModulePath) -> Self {
        path.to_string()
    }
}

impl From<Vec<String>> for ModulePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ModulePath {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        let p = path("pkg.head.users");
        assert_eq!(p.len(), 3);
        assert_eq!(p.to_string(), "pkg.head.users");
        assert_eq!(p.last(), Some("users"));
        assert_eq!(p.parent(), Some(path("pkg.head")));
        assert!(ModulePath::root().is_empty());
    }

    #[test]
    fn parse_rejects_bad_segments() {
        assert!(matches!(
            "pkg..users".parse::<ModulePath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            "pkg.my-mod".parse::<ModulePath>(),
            Err(PathError::InvalidSegment(seg)) if seg == "my-mod"
        ));
    }

    #[test]
    fn prefix_and_child() {
        let module = path("pkg.head");
        let class = module.child("Widget");
        assert!(module.is_prefix_of(&class));
        assert!(!class.is_prefix_of(&module));
        assert_eq!(class.to_string(), "pkg.head.Widget");
    }

    #[test]
    fn with_segment_replaces_in_range_only() {
        let p = path("pkg.head.users");
        assert_eq!(p.with_segment(1, "v2000_01_01"), path("pkg.v2000_01_01.users"));
        assert_eq!(p.with_segment(9, "x"), p);
    }

    #[test]
    fn resolve_relative_imports() {
        let module = path("pkg.head.users");
        assert_eq!(module.resolve_import(false, ".common").unwrap(), path("pkg.head.common"));
        assert_eq!(module.resolve_import(false, "..shared").unwrap(), path("pkg.shared"));
        assert_eq!(module.resolve_import(false, ".").unwrap(), path("pkg.head"));
        assert_eq!(module.resolve_import(false, "pydantic").unwrap(), path("pydantic"));

        let package = path("pkg.head");
        assert_eq!(package.resolve_import(true, ".users").unwrap(), path("pkg.head.users"));
        assert_eq!(package.resolve_import(true, "..").unwrap(), path("pkg"));
    }

    #[test]
    fn resolve_beyond_top_level_fails() {
        let module = path("pkg.users");
        assert!(matches!(
            module.resolve_import(false, "...x"),
            Err(PathError::BeyondTopLevel { .. })
        ));
    }

    #[test]
    fn serde_as_string() {
        let p: ModulePath = serde_json::from_str("\"pkg.head.Widget\"").unwrap();
        assert_eq!(p, path("pkg.head.Widget"));
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"pkg.head.Widget\"");
        assert!(serde_json::from_str::<ModulePath>("\"a..b\"").is_err());
    }
}

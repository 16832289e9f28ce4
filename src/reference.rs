//! Permanent artifact references (`disk::<path>`).

use std::fmt;
use std::path::{Component, Path};
use thiserror::Error;

/// Prefix marking an image target as a permanent artifact reference.
pub const PERMANENT_PREFIX: &str = "disk::";

/// Directory used when the artifact producer did not report a path.
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";

/// Errors raised while validating a reference path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// Path climbs above the container root through `..` components.
    #[error("path escapes container root: {0}")]
    EscapesRoot(String),
    /// Path is absolute or carries a platform prefix.
    #[error("path must be relative: {0}")]
    NotRelative(String),
}

/// Logical identifier of a stored artifact.
///
/// Persisted in markdown as `![alt](disk::<path>)` and never rewritten in
/// stored content. The path is kept verbatim, including any characters that
/// need percent-encoding once embedded in a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactReference {
    path: String,
}

impl ArtifactReference {
    /// Creates reference for a container relative path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Parses image target in permanent form.
    ///
    /// Returns `None` when the target does not start with [`PERMANENT_PREFIX`].
    /// An empty path after the prefix is accepted: it is a degraded reference,
    /// not a parse failure.
    pub fn parse(target: &str) -> Option<Self> {
        target.strip_prefix(PERMANENT_PREFIX).map(Self::new)
    }

    /// Builds reference for an artifact produced by a tool invocation.
    ///
    /// Producers sometimes fail to report where they wrote the file. In that
    /// case the path defaults to `artifacts/<filename>`, where the file name
    /// is the last component of `filename` as given to the tool.
    ///
    /// # Arguments
    ///
    /// * `reported_path`: Path reported by the artifact producer, if any
    /// * `filename`: File name passed to the tool invocation
    pub fn from_tool_output(reported_path: Option<&str>, filename: &str) -> Self {
        if let Some(path) = reported_path.map(str::trim).filter(|p| !p.is_empty()) {
            return Self::new(path);
        }

        let name = Path::new(filename.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        if name.is_empty() {
            tracing::warn!(filename, "artifact reported no path and no file name");
            return Self::new("");
        }

        Self::new(format!("{}/{}", DEFAULT_ARTIFACT_DIR, name))
    }

    /// Path relative to the owning container.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the reference carries no path.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Markdown image recording this artifact.
    ///
    /// Paths containing whitespace or parentheses use the `<...>` destination
    /// form so that markdown renderers accept them.
    pub fn to_markdown_image(&self, alt: &str) -> String {
        let needs_brackets = self
            .path
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')');

        if needs_brackets {
            format!("![{}](<{}>)", alt, self)
        } else {
            format!("![{}]({})", alt, self)
        }
    }

    /// Normalizes path by resolving `.` and `..` components.
    ///
    /// Security: prevents lookups outside the container root.
    ///
    /// # Errors
    ///
    /// Returns error if the path is absolute or climbs above the root
    pub fn normalized_path(&self) -> Result<String, ReferenceError> {
        let mut components: Vec<&str> = Vec::new();

        for component in Path::new(&self.path).components() {
            match component {
                Component::Normal(c) => {
                    let part = c
                        .to_str()
                        .ok_or_else(|| ReferenceError::NotRelative(self.path.clone()))?;
                    components.push(part);
                }
                Component::ParentDir => {
                    if components.pop().is_none() {
                        return Err(ReferenceError::EscapesRoot(self.path.clone()));
                    }
                }
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ReferenceError::NotRelative(self.path.clone()));
                }
            }
        }

        Ok(components.join("/"))
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PERMANENT_PREFIX, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permanent_target() {
        // Arrange & Act
        let reference = ArtifactReference::parse("disk::artifacts/chart.png");

        // Assert
        assert_eq!(
            reference.map(|r| r.path().to_string()),
            Some("artifacts/chart.png".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_other_targets() {
        assert!(ArtifactReference::parse("https://example.com/a.png").is_none());
        assert!(ArtifactReference::parse("./disk::a.png").is_none());
        assert!(ArtifactReference::parse("DISK::a.png").is_none());
    }

    #[test]
    fn test_parse_empty_path_is_degraded_not_rejected() {
        // Arrange & Act
        let reference = ArtifactReference::parse("disk::").expect("Prefix alone should parse");

        // Assert
        assert!(reference.is_empty());
        assert_eq!(reference.to_string(), "disk::");
    }

    #[test]
    fn test_display_round_trips_path() {
        let reference = ArtifactReference::new("a/b (1).png");
        assert_eq!(reference.to_string(), "disk::a/b (1).png");
        assert_eq!(
            ArtifactReference::parse(&reference.to_string()),
            Some(reference)
        );
    }

    #[test]
    fn test_from_tool_output_uses_reported_path() {
        let reference = ArtifactReference::from_tool_output(Some("out/plot.svg"), "plot.svg");
        assert_eq!(reference.path(), "out/plot.svg");
    }

    #[test]
    fn test_from_tool_output_defaults_missing_path() {
        // Arrange & Act
        let missing = ArtifactReference::from_tool_output(None, "chart.png");
        let blank = ArtifactReference::from_tool_output(Some("  "), "chart.png");

        // Assert
        assert_eq!(missing.path(), "artifacts/chart.png");
        assert_eq!(blank.path(), "artifacts/chart.png");
    }

    #[test]
    fn test_from_tool_output_keeps_file_name_only() {
        let reference = ArtifactReference::from_tool_output(None, "/tmp/work/report.pdf");
        assert_eq!(reference.path(), "artifacts/report.pdf");
    }

    #[test]
    fn test_from_tool_output_without_any_name_is_empty() {
        let reference = ArtifactReference::from_tool_output(None, "");
        assert!(reference.is_empty(), "Degraded reference should stay empty");
    }

    #[test]
    fn test_to_markdown_image_plain_path() {
        let reference = ArtifactReference::new("artifacts/chart.png");
        assert_eq!(
            reference.to_markdown_image("chart"),
            "![chart](disk::artifacts/chart.png)"
        );
    }

    #[test]
    fn test_to_markdown_image_brackets_spaces() {
        let reference = ArtifactReference::new("a/b (1).png");
        assert_eq!(reference.to_markdown_image("a"), "![a](<disk::a/b (1).png>)");
    }

    #[test]
    fn test_normalized_path_resolves_dots() {
        let reference = ArtifactReference::new("./artifacts/../artifacts/./chart.png");
        assert_eq!(
            reference.normalized_path(),
            Ok("artifacts/chart.png".to_string())
        );
    }

    #[test]
    fn test_normalized_path_rejects_traversal() {
        // Arrange
        let reference = ArtifactReference::new("../../etc/passwd");

        // Act
        let result = reference.normalized_path();

        // Assert
        assert_eq!(
            result,
            Err(ReferenceError::EscapesRoot("../../etc/passwd".to_string()))
        );
    }

    #[test]
    fn test_normalized_path_rejects_absolute() {
        let reference = ArtifactReference::new("/etc/passwd");
        assert!(matches!(
            reference.normalized_path(),
            Err(ReferenceError::NotRelative(_))
        ));
    }
}

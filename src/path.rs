//! Component paths - addressing components by name from the root down
//!
//! Format: `<root>/<child>/<grandchild>...`
//!
//! Examples:
//! - `G2` (a root component)
//! - `G2/G1/Q3` (Q3, child of G1, child of root G2)
//!
//! Names are only unique among siblings, so a path is resolved one level at a
//! time against the children mapping of the previous segment.

use crate::component::validate_name;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments
pub const SEPARATOR: char = '/';

/// Name path from a root component to a descendant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentPath {
    segments: Vec<String>,
}

impl ComponentPath {
    /// Create a path from already-split segments
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::InvalidPath("path must have at least one segment".to_string()));
        }
        for segment in &segments {
            validate_name(segment).map_err(|e| Error::InvalidPath(e.to_string()))?;
        }
        Ok(Self { segments })
    }

    /// Parse a path string.
    ///
    /// Leading and trailing separators are ignored; empty inner segments are not.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim().trim_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Err(Error::InvalidPath(format!("'{}' is empty", path)));
        }
        Self::new(trimmed.split(SEPARATOR))
    }

    /// Name of the root component
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Last segment: the name of the addressed component
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Path of the parent component, `None` for a root path
    pub fn parent(&self) -> Option<ComponentPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Extend the path by one child name
    pub fn join(&self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name).map_err(|e| Error::InvalidPath(e.to_string()))?;
        let mut segments = self.segments.clone();
        segments.push(name);
        Ok(Self { segments })
    }

    /// Convert to path string
    pub fn to_path_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

impl FromStr for ComponentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

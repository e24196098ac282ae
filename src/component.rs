//! Component types - the polymorphic records held by the store
//!
//! Every component shares identity and tree fields; the kind discriminator
//! selects which extra attributes it carries:
//! - `Group`: pure organizational node, no attributes
//! - `Quadrupole`: `prop1`
//! - `Crystal`: `prop2`

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a component name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Stable integer identity of a component, assigned on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub i64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl ToSql for ComponentId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for ComponentId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(ComponentId)
    }
}

/// Discriminator stored with every component record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Organizational node grouping other components
    Group,
    /// Quadrupole magnet
    Quadrupole,
    /// Crystal
    Crystal,
}

impl ComponentKind {
    /// Get the string representation stored in the discriminator column
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Group => "group",
            ComponentKind::Quadrupole => "quadrupole",
            ComponentKind::Crystal => "crystal",
        }
    }

    /// Get all component kinds
    pub fn all() -> &'static [ComponentKind] {
        &[
            ComponentKind::Group,
            ComponentKind::Quadrupole,
            ComponentKind::Crystal,
        ]
    }

    /// Names of the attributes this kind carries
    pub fn attribute_names(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Group => &[],
            ComponentKind::Quadrupole => &["prop1"],
            ComponentKind::Crystal => &["prop2"],
        }
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "group" | "grp" => Ok(ComponentKind::Group),
            "quadrupole" | "quad" | "q" => Ok(ComponentKind::Quadrupole),
            "crystal" | "xtal" | "c" => Ok(ComponentKind::Crystal),
            _ => Err(Error::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific attributes of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attributes {
    Group,
    Quadrupole { prop1: f64 },
    Crystal { prop2: f64 },
}

impl Attributes {
    /// The kind these attributes belong to
    pub fn kind(&self) -> ComponentKind {
        match self {
            Attributes::Group => ComponentKind::Group,
            Attributes::Quadrupole { .. } => ComponentKind::Quadrupole,
            Attributes::Crystal { .. } => ComponentKind::Crystal,
        }
    }

    /// Check that these attributes are valid for `kind`
    pub fn validate_for(&self, kind: ComponentKind) -> Result<()> {
        if self.kind() != kind {
            return Err(Error::InvalidVariant {
                kind,
                reason: format!("got {} attributes", self.kind()),
            });
        }
        let value = match *self {
            Attributes::Group => None,
            Attributes::Quadrupole { prop1 } => Some(("prop1", prop1)),
            Attributes::Crystal { prop2 } => Some(("prop2", prop2)),
        };
        if let Some((field, v)) = value {
            if !v.is_finite() {
                return Err(Error::InvalidVariant {
                    kind,
                    reason: format!("{} must be finite, got {}", field, v),
                });
            }
        }
        Ok(())
    }

    /// Build attributes for `kind` from `name=value` pairs.
    ///
    /// Every attribute of the kind must be given exactly once and no other
    /// names are accepted.
    pub fn from_pairs(kind: ComponentKind, pairs: &[(String, f64)]) -> Result<Self> {
        let allowed = kind.attribute_names();
        for (i, (key, _)) in pairs.iter().enumerate() {
            if !allowed.contains(&key.as_str()) {
                return Err(Error::InvalidVariant {
                    kind,
                    reason: format!("unknown attribute '{}'", key),
                });
            }
            if pairs[..i].iter().any(|(k, _)| k == key) {
                return Err(Error::InvalidVariant {
                    kind,
                    reason: format!("attribute '{}' given twice", key),
                });
            }
        }
        let lookup = |field: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == field)
                .map(|(_, v)| *v)
                .ok_or_else(|| Error::InvalidVariant {
                    kind,
                    reason: format!("missing attribute '{}'", field),
                })
        };

        let attributes = match kind {
            ComponentKind::Group => Attributes::Group,
            ComponentKind::Quadrupole => Attributes::Quadrupole { prop1: lookup("prop1")? },
            ComponentKind::Crystal => Attributes::Crystal { prop2: lookup("prop2")? },
        };
        attributes.validate_for(kind)?;
        Ok(attributes)
    }

    pub fn prop1(&self) -> Option<f64> {
        match self {
            Attributes::Quadrupole { prop1 } => Some(*prop1),
            _ => None,
        }
    }

    pub fn prop2(&self) -> Option<f64> {
        match self {
            Attributes::Crystal { prop2 } => Some(*prop2),
            _ => None,
        }
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attributes::Group => Ok(()),
            Attributes::Quadrupole { prop1 } => write!(f, "prop1={}", prop1),
            Attributes::Crystal { prop2 } => write!(f, "prop2={}", prop2),
        }
    }
}

/// Validate a component name: non-empty, at most [`MAX_NAME_LEN`] characters,
/// and free of the path separator.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name must not be empty".to_string())
    } else if name.chars().count() > MAX_NAME_LEN {
        Some(format!("name is longer than {} characters", MAX_NAME_LEN))
    } else if name.contains('/') {
        Some("name must not contain '/'".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// A component record as held by the store.
///
/// The kind is fixed by the attributes and cannot change after creation.
/// Children are not stored on the record: they are every component whose
/// `parent` points here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    /// Free-text reference to an external data file
    pub associated_datafile: Option<String>,
    pub parent: Option<ComponentId>,
    #[serde(flatten)]
    attributes: Attributes,
}

impl Component {
    pub(crate) fn from_parts(
        id: ComponentId,
        name: String,
        associated_datafile: Option<String>,
        parent: Option<ComponentId>,
        attributes: Attributes,
    ) -> Self {
        Self {
            id,
            name,
            associated_datafile,
            parent,
            attributes,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.attributes.kind()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn prop1(&self) -> Option<f64> {
        self.attributes.prop1()
    }

    pub fn prop2(&self) -> Option<f64> {
        self.attributes.prop2()
    }
}

/// Draft of a component to be created by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub attributes: Attributes,
    pub parent: Option<ComponentId>,
    pub associated_datafile: Option<String>,
}

impl NewComponent {
    /// Create a draft with an explicit kind and attribute set.
    ///
    /// Mismatches are reported by the store when the draft is created.
    pub fn new(kind: ComponentKind, name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes,
            parent: None,
            associated_datafile: None,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Group, name, Attributes::Group)
    }

    pub fn quadrupole(name: impl Into<String>, prop1: f64) -> Self {
        Self::new(ComponentKind::Quadrupole, name, Attributes::Quadrupole { prop1 })
    }

    pub fn crystal(name: impl Into<String>, prop2: f64) -> Self {
        Self::new(ComponentKind::Crystal, name, Attributes::Crystal { prop2 })
    }

    /// Set the parent the component is created under
    pub fn with_parent(mut self, parent: ComponentId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the associated data file
    pub fn with_datafile(mut self, datafile: impl Into<String>) -> Self {
        self.associated_datafile = Some(datafile.into());
        self
    }

    /// Validate name and attributes
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        self.attributes.validate_for(self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in ComponentKind::all() {
            let parsed: ComponentKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(ComponentKind::from_str("quad").unwrap(), ComponentKind::Quadrupole);
        assert_eq!(ComponentKind::from_str("XTAL").unwrap(), ComponentKind::Crystal);
        assert!(matches!(
            ComponentKind::from_str("dipole"),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn test_mismatched_attributes_rejected() {
        let draft = NewComponent::new(
            ComponentKind::Crystal,
            "C1",
            Attributes::Quadrupole { prop1: 1.0 },
        );
        assert!(matches!(
            draft.validate(),
            Err(Error::InvalidVariant { kind: ComponentKind::Crystal, .. })
        ));
    }

    #[test]
    fn test_non_finite_attribute_rejected() {
        let draft = NewComponent::quadrupole("Q1", f64::NAN);
        assert!(matches!(draft.validate(), Err(Error::InvalidVariant { .. })));
    }

    #[test]
    fn test_from_pairs() {
        let attrs =
            Attributes::from_pairs(ComponentKind::Quadrupole, &[("prop1".into(), 1.2)]).unwrap();
        assert_eq!(attrs, Attributes::Quadrupole { prop1: 1.2 });

        assert_eq!(
            Attributes::from_pairs(ComponentKind::Group, &[]).unwrap(),
            Attributes::Group
        );

        let missing = Attributes::from_pairs(ComponentKind::Crystal, &[]);
        assert!(matches!(missing, Err(Error::InvalidVariant { .. })));

        let foreign =
            Attributes::from_pairs(ComponentKind::Crystal, &[("prop1".into(), 0.1)]);
        assert!(matches!(foreign, Err(Error::InvalidVariant { .. })));

        let twice = Attributes::from_pairs(
            ComponentKind::Quadrupole,
            &[("prop1".into(), 1.0), ("prop1".into(), 2.0)],
        );
        assert!(matches!(twice, Err(Error::InvalidVariant { .. })));
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("Q1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_component_json_shape() {
        let c = Component::from_parts(
            ComponentId(3),
            "Q3".into(),
            None,
            Some(ComponentId(1)),
            Attributes::Quadrupole { prop1: 3.1 },
        );
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "quadrupole");
        assert_eq!(json["prop1"], 3.1);
        assert_eq!(json["parent"], 1);

        let back: Component = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}

//! Typed document nodes and reference edges.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared `kind` of a content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Catalog,
    Index,
    Pack,
    Drill,
    Exam,
    Track,
}

impl DocKind {
    pub const ENTRY_KINDS: [DocKind; 4] = [Self::Pack, Self::Drill, Self::Exam, Self::Track];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "catalog" => Some(Self::Catalog),
            "index" => Some(Self::Index),
            "pack" => Some(Self::Pack),
            "drill" => Some(Self::Drill),
            "exam" => Some(Self::Exam),
            "track" => Some(Self::Track),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Index => "index",
            Self::Pack => "pack",
            Self::Drill => "drill",
            Self::Exam => "exam",
            Self::Track => "track",
        }
    }

    pub fn is_entry(self) -> bool {
        Self::ENTRY_KINDS.contains(&self)
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared `schemaVersion`, as a closed tag.
///
/// Each known variant owns its own required-field table; anything else is
/// carried verbatim so the validator can name it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaVersion {
    V1,
    V2,
    /// Declared but not a supported version (raw JSON text).
    Unknown(String),
    /// No `schemaVersion` field at all.
    Missing,
}

impl SchemaVersion {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => Self::Missing,
            Some(v) => match v.as_u64() {
                Some(1) => Self::V1,
                Some(2) => Self::V2,
                _ => Self::Unknown(v.to_string()),
            },
        }
    }

    /// Numeric version for known variants.
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::V1 => Some(1),
            Self::V2 => Some(2),
            _ => None,
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
            Self::V2 => write!(f, "2"),
            Self::Unknown(raw) => write!(f, "{raw}"),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

/// Index into the graph's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// One parsed document.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Canonical path relative to the content root.
    pub path: String,
    pub kind: DocKind,
    pub version: SchemaVersion,
    pub doc: Value,
}

impl Node {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.doc.get(name).and_then(Value::as_str)
    }

    /// Entry/section identifier, when the document declares one.
    pub fn doc_id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }
}

/// Which recognized field produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefField {
    EntryUrl,
    ItemsUrl,
    NextPage,
    ItemIds,
}

impl RefField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntryUrl => "entryUrl",
            Self::ItemsUrl => "itemsUrl",
            Self::NextPage => "nextPage",
            Self::ItemIds => "itemIds",
        }
    }
}

/// Where a reference points, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// A canonical document path.
    Path(String),
    /// An entry identifier, optionally constrained to one kind.
    EntryId {
        kind: Option<DocKind>,
        id: String,
    },
    /// A URL that cannot name a document (scheme, query, traversal, empty).
    Unresolvable(String),
}

/// A deferred typed edge `(source, target, expected kind)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub source: NodeId,
    pub field: RefField,
    /// JSON location within the source, e.g. `items[2].entryUrl`.
    pub locator: String,
    /// The raw value as written in the document.
    pub raw: String,
    pub target: RefTarget,
    /// `None` means any entry kind.
    pub expected: Option<DocKind>,
    /// Summary `id` written next to an `entryUrl`.
    pub summary_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_version_tags() {
        assert_eq!(SchemaVersion::from_value(Some(&json!(1))), SchemaVersion::V1);
        assert_eq!(SchemaVersion::from_value(Some(&json!(2))), SchemaVersion::V2);
        assert_eq!(
            SchemaVersion::from_value(Some(&json!(7))),
            SchemaVersion::Unknown("7".to_string())
        );
        assert_eq!(
            SchemaVersion::from_value(Some(&json!("1"))),
            SchemaVersion::Unknown("\"1\"".to_string())
        );
        assert_eq!(SchemaVersion::from_value(None), SchemaVersion::Missing);
    }

    #[test]
    fn kind_round_trip() {
        for kind in [DocKind::Catalog, DocKind::Index, DocKind::Pack, DocKind::Track] {
            assert_eq!(DocKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DocKind::parse("scenario"), None);
        assert!(DocKind::Exam.is_entry());
        assert!(!DocKind::Index.is_entry());
    }
}

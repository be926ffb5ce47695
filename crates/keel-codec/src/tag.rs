use serde_json::{Map, Value as Json};

/// Reserved member naming the rich type a JSON object encodes.
pub const TAG_FIELD: &str = "__class__";

/// Reserved member holding base64 text of a byte blob.
pub const BYTES_FIELD: &str = "__bytes__";

pub const DATE_TAG: &str = "date";
pub const TIME_TAG: &str = "time";
pub const DATETIME_TAG: &str = "datetime";
pub const OID_TAG: &str = "oid";

/// What a JSON object in a payload tree represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// No tag: an ordinary mapping.
    Plain,
    Date,
    Time,
    DateTime,
    /// A lone [`BYTES_FIELD`] member.
    Bytes,
    Oid,
    /// Tagged with a name this transcoder does not know; passes through.
    Unknown,
}

impl NodeKind {
    /// Classify a JSON object by its reserved members.
    pub fn classify(node: &Map<String, Json>) -> Self {
        match node.get(TAG_FIELD) {
            None if node.len() == 1 && node.contains_key(BYTES_FIELD) => Self::Bytes,
            None => Self::Plain,
            Some(Json::String(tag)) => Self::from_tag(tag),
            Some(_) => Self::Unknown,
        }
    }

    /// Map a tag name to its kind. Unrecognized names are [`NodeKind::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            DATE_TAG => Self::Date,
            TIME_TAG => Self::Time,
            DATETIME_TAG => Self::DateTime,
            OID_TAG => Self::Oid,
            _ => Self::Unknown,
        }
    }

    /// Whether decoding this kind yields a rich value rather than a map.
    pub fn is_rich(&self) -> bool {
        !matches!(self, Self::Plain | Self::Unknown)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Date => write!(f, "{DATE_TAG}"),
            Self::Time => write!(f, "{TIME_TAG}"),
            Self::DateTime => write!(f, "{DATETIME_TAG}"),
            Self::Bytes => write!(f, "bytes"),
            Self::Oid => write!(f, "{OID_TAG}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(v: Json) -> NodeKind {
        NodeKind::classify(v.as_object().unwrap())
    }

    #[test]
    fn untagged_is_plain() {
        assert_eq!(classify(json!({"a": 1})), NodeKind::Plain);
        assert_eq!(classify(json!({})), NodeKind::Plain);
    }

    #[test]
    fn known_tags() {
        assert_eq!(classify(json!({"__class__": "date"})), NodeKind::Date);
        assert_eq!(classify(json!({"__class__": "time"})), NodeKind::Time);
        assert_eq!(classify(json!({"__class__": "datetime"})), NodeKind::DateTime);
        assert_eq!(classify(json!({"__class__": "oid"})), NodeKind::Oid);
    }

    #[test]
    fn unknown_tags() {
        assert_eq!(classify(json!({"__class__": "app.Address"})), NodeKind::Unknown);
        assert_eq!(classify(json!({"__class__": 7})), NodeKind::Unknown);
    }

    #[test]
    fn bytes_needs_lone_member() {
        assert_eq!(classify(json!({"__bytes__": "AA=="})), NodeKind::Bytes);
        assert_eq!(classify(json!({"__bytes__": "AA==", "x": 1})), NodeKind::Plain);
    }

    #[test]
    fn rich_kinds() {
        assert!(NodeKind::Date.is_rich());
        assert!(NodeKind::Bytes.is_rich());
        assert!(!NodeKind::Plain.is_rich());
        assert!(!NodeKind::Unknown.is_rich());
    }
}

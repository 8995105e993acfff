use {
    super::id::SubjectId,
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, fmt},
};

/// Field names that carry the subject of an event when no ambient scope is active.
/// Matched ASCII case-insensitively.
pub const SUBJECT_FIELD_KEYS: [&str; 2] = ["subjectId", "UserId"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<SubjectId> for FieldValue {
    fn from(v: SubjectId) -> Self {
        Self::Int(v.get())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Structured key/value pairs attached to a log event, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, FieldValue>",
    into = "BTreeMap<String, FieldValue>"
)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Subject carried by the first reserved subject field, if it holds an integer.
    pub fn subject_id(&self) -> Option<SubjectId> {
        let (_, value) = self.0.iter().find(|(k, _)| {
            SUBJECT_FIELD_KEYS
                .iter()
                .any(|reserved| k.eq_ignore_ascii_case(reserved))
        })?;

        match value {
            FieldValue::Int(id) => Some(SubjectId::new(*id)),
            _ => None,
        }
    }

    /// Substitute `{name}` holes in `template` with field values.
    ///
    /// `{{` and `}}` produce literal braces. A hole may carry a `@`/`$` prefix or
    /// a `:format`/`,align` suffix; both are ignored for lookup. Holes naming an
    /// unknown field are kept verbatim.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }

            if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
                continue;
            }

            let Some(close) = tail.find('}') else {
                out.push_str(tail);
                rest = "";
                break;
            };

            let hole = &tail[1..close];
            let name = hole
                .trim_start_matches(['@', '$'])
                .split([':', ','])
                .next()
                .unwrap_or_default()
                .trim();

            match self.get(name) {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

impl From<BTreeMap<String, FieldValue>> for Fields {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<Fields> for BTreeMap<String, FieldValue> {
    fn from(fields: Fields) -> Self {
        fields.0.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

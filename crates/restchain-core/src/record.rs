//! Flat, ordered field records flowing through a chain

use crate::error::ExtractError;

/// A single scalar field value.
///
/// `Absent` is the explicit sentinel for missing or null leaves; projection
/// never fails just because a response omitted a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Render for URL/param substitution.
    pub fn as_display(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Absent => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Value::from(*n),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Absent => serde_json::Value::Null,
        }
    }
}

impl From<&serde_json::Value> for FieldValue {
    /// Scalar JSON leaves map directly; arrays and objects are not scalars
    /// and map to `Absent`, as does null.
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => Self::Absent,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// An ordered mapping from field name to scalar value.
///
/// Field names are unique within one record; uniqueness across a merge is
/// guaranteed by chain construction, not checked per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Build a record from `(name, value)` pairs, rejecting duplicate names.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Result<Self, ExtractError>
    where
        N: Into<String>,
        V: Into<FieldValue>,
    {
        let mut fields: Vec<(String, FieldValue)> = Vec::new();
        for (name, value) in pairs {
            let name = name.into();
            if fields.iter().any(|(n, _)| *n == name) {
                return Err(ExtractError::Configuration(format!(
                    "duplicate field name '{name}' in record"
                )));
            }
            fields.push((name, value.into()));
        }
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Present with a non-`Absent` value.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_absent())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parent ∪ child: parent fields first, child fields appended.
    ///
    /// Name disjointness is enforced when the chain is built, so a collision
    /// here is a bug in validation rather than in data.
    pub fn merged(&self, child: &Record) -> Record {
        let mut fields = self.fields.clone();
        for (name, value) in &child.fields {
            debug_assert!(
                !fields.iter().any(|(n, _)| n == name),
                "field '{name}' collides across merge"
            );
            fields.push((name.clone(), value.clone()));
        }
        Record { fields }
    }

    /// JSON object view, preserving field order. `Absent` becomes null.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

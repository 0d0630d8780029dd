//! Tuple-path projection over JSON response bodies
//!
//! Expressions are a dotted path with `[*]` fan-out steps and a trailing
//! tuple capture, e.g. `_embedded.spaces[*].[token,name,description]`: walk
//! into `_embedded.spaces`, fan out over the array, and capture a fixed-arity
//! tuple of leaves from each element. Capture entries may themselves be
//! dotted (`[owner.name,token]`).

use crate::error::ExtractError;
use crate::record::{FieldValue, Record};

#[derive(Debug, Clone, PartialEq)]
enum Step {
    /// Descend into an object key; non-objects and missing keys match nothing.
    Key(String),
    /// Fan out over an array; non-arrays match nothing.
    Wildcard,
}

/// A parsed path expression ending in a tuple capture.
#[derive(Debug, Clone, PartialEq)]
pub struct TuplePath {
    raw: String,
    steps: Vec<Step>,
    capture: Vec<Vec<String>>,
}

impl TuplePath {
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        let bad = |msg: String| ExtractError::Configuration(msg);

        // Split off the trailing `[a,b,c]` capture.
        let (prefix, capture_body) = if let Some(rest) = raw.strip_prefix('[') {
            ("", rest)
        } else if let Some(pos) = raw.rfind(".[") {
            (&raw[..pos], &raw[pos + 2..])
        } else {
            return Err(bad(format!(
                "path '{raw}' has no trailing tuple capture '[..]'"
            )));
        };
        let capture_body = capture_body
            .strip_suffix(']')
            .ok_or_else(|| bad(format!("unclosed tuple capture in path '{raw}'")))?;
        if capture_body.contains('[') || capture_body.contains(']') {
            return Err(bad(format!("nested brackets in tuple capture of '{raw}'")));
        }

        let mut capture = Vec::new();
        for entry in capture_body.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(bad(format!("empty entry in tuple capture of '{raw}'")));
            }
            let subpath: Vec<String> = entry.split('.').map(str::to_string).collect();
            if subpath.iter().any(String::is_empty) {
                return Err(bad(format!("empty key in capture entry '{entry}' of '{raw}'")));
            }
            capture.push(subpath);
        }

        let mut steps = Vec::new();
        if !prefix.is_empty() {
            for token in prefix.split('.') {
                if token == "[*]" {
                    steps.push(Step::Wildcard);
                    continue;
                }
                let (key, wild) = match token.strip_suffix("[*]") {
                    Some(key) => (key, true),
                    None => (token, false),
                };
                if key.is_empty() || key.contains('[') || key.contains(']') {
                    return Err(bad(format!("invalid path step '{token}' in '{raw}'")));
                }
                steps.push(Step::Key(key.to_string()));
                if wild {
                    steps.push(Step::Wildcard);
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            steps,
            capture,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of values each captured tuple carries.
    pub fn arity(&self) -> usize {
        self.capture.len()
    }

    /// Nodes matched by the step prefix, in document order.
    fn matches<'v>(&self, body: &'v serde_json::Value) -> Vec<&'v serde_json::Value> {
        let mut nodes = vec![body];
        for step in &self.steps {
            nodes = match step {
                Step::Key(key) => nodes.iter().filter_map(|n| n.get(key)).collect(),
                Step::Wildcard => nodes
                    .iter()
                    .filter_map(|n| n.as_array())
                    .flatten()
                    .collect(),
            };
        }
        nodes
    }

    fn capture_leaf<'v>(
        node: &'v serde_json::Value,
        subpath: &[String],
    ) -> Option<&'v serde_json::Value> {
        let mut current = node;
        for key in subpath {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Evaluate against a response body, zipping each captured tuple to
    /// `field_names` positionally.
    ///
    /// Zero matched nodes is the normal "no results" case and yields an empty
    /// vec. Missing or null leaves become [`FieldValue::Absent`].
    pub fn project(
        &self,
        body: &serde_json::Value,
        field_names: &[String],
    ) -> Result<Vec<Record>, ExtractError> {
        if field_names.len() != self.arity() {
            return Err(ExtractError::Projection(format!(
                "path '{}' captures {} values but {} field names were given",
                self.raw,
                self.arity(),
                field_names.len()
            )));
        }
        let mut records = Vec::new();
        for node in self.matches(body) {
            let pairs = field_names.iter().zip(&self.capture).map(|(name, subpath)| {
                let value = Self::capture_leaf(node, subpath)
                    .map(FieldValue::from)
                    .unwrap_or(FieldValue::Absent);
                (name.clone(), value)
            });
            records.push(Record::from_pairs(pairs)?);
        }
        Ok(records)
    }
}

//! URL and parameter templates with `{field}` placeholders
//!
//! Placeholders are extracted at construction so the chain builder can check
//! every reference against the fields its parents actually produce; rendering
//! then only fails when a parent legitimately omitted a sparse field.

use crate::error::ExtractError;
use crate::record::Record;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A template string like `https://x/{org}/spaces/{group_id}/reports`.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
                            Some(c) => {
                                return Err(ExtractError::Configuration(format!(
                                    "invalid character '{c}' in placeholder of template '{raw}'"
                                )));
                            }
                            None => {
                                return Err(ExtractError::Configuration(format!(
                                    "unclosed placeholder in template '{raw}'"
                                )));
                            }
                        }
                    }
                    if name.is_empty() {
                        return Err(ExtractError::Configuration(format!(
                            "empty placeholder in template '{raw}'"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(ExtractError::Configuration(format!(
                        "unmatched '}}' in template '{raw}'"
                    )));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Field names this template references, in order of first appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Substitute fields from `record` into the template.
    ///
    /// A missing field or an `Absent` sentinel is a [`ExtractError::Substitution`];
    /// sparse parents must be handled by a skip policy before rendering.
    pub fn render(&self, record: &Record) -> Result<String, ExtractError> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(name) => {
                    let value = record
                        .get(name)
                        .and_then(|v| v.as_display())
                        .ok_or_else(|| ExtractError::Substitution {
                            placeholder: name.clone(),
                        })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

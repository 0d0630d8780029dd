//! Chain construction and validation
//!
//! A chain owns its levels as an ordered sequence rooted at literal seed
//! records. All invariants are checked when the chain is built: a level may
//! reference only fields produced by earlier levels, projected field names
//! must not collide with inherited ones, and the seed must be non-empty.
//! Execution never re-validates.

use crate::error::{ExtractError, FailurePolicy};
use crate::path::TuplePath;
use crate::record::Record;
use crate::template::UrlTemplate;
use crate::transport::BasicCredential;

/// When to skip a level's HTTP call for one parent record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Always issue the call.
    #[default]
    AlwaysCall,
    /// Skip the call when the parent lacks a value for any named join key.
    SkipIfParentFieldAbsent { keys: Vec<String> },
}

/// One level of a chain: where to call, what to extract, what to name it.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub(crate) url: UrlTemplate,
    pub(crate) params: Vec<(String, UrlTemplate)>,
    pub(crate) path: TuplePath,
    pub(crate) field_names: Vec<String>,
    pub(crate) skip: SkipPolicy,
}

impl JoinSpec {
    /// Parse templates and the path expression; `field_names` must match the
    /// path's tuple arity and be unique.
    pub fn new(url: &str, json_path: &str, field_names: &[&str]) -> Result<Self, ExtractError> {
        let url = UrlTemplate::parse(url)?;
        let path = TuplePath::parse(json_path)?;
        if field_names.len() != path.arity() {
            return Err(ExtractError::Configuration(format!(
                "path '{}' captures {} values but {} field names were given",
                path.raw(),
                path.arity(),
                field_names.len()
            )));
        }
        let field_names: Vec<String> = field_names.iter().map(|s| s.to_string()).collect();
        for (i, name) in field_names.iter().enumerate() {
            if field_names[..i].contains(name) {
                return Err(ExtractError::Configuration(format!(
                    "duplicate output field name '{name}'"
                )));
            }
        }
        Ok(Self {
            url,
            params: Vec::new(),
            path,
            field_names,
            skip: SkipPolicy::AlwaysCall,
        })
    }

    /// Add a request parameter; the value may itself contain placeholders.
    pub fn param(mut self, name: &str, value: &str) -> Result<Self, ExtractError> {
        self.params.push((name.to_string(), UrlTemplate::parse(value)?));
        Ok(self)
    }

    /// Skip this level's call when the parent has no value for any of `keys`.
    pub fn skip_if_absent(mut self, keys: &[&str]) -> Self {
        self.skip = SkipPolicy::SkipIfParentFieldAbsent {
            keys: keys.iter().map(|s| s.to_string()).collect(),
        };
        self
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Every field this level's URL and params reference.
    fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.url
            .placeholders()
            .chain(self.params.iter().flat_map(|(_, v)| v.placeholders()))
    }
}

/// A validated chain: seed records plus ordered [`JoinSpec`] levels.
#[derive(Debug, Clone)]
pub struct Chain {
    pub(crate) seed: Vec<Record>,
    pub(crate) levels: Vec<JoinSpec>,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) credential: Option<BasicCredential>,
}

impl Chain {
    pub fn builder(seed: Vec<Record>) -> ChainBuilder {
        ChainBuilder::seed(seed)
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

/// Builds and validates a [`Chain`].
#[derive(Debug, Default)]
pub struct ChainBuilder {
    seed: Vec<Record>,
    levels: Vec<JoinSpec>,
    failure_policy: FailurePolicy,
    credential: Option<BasicCredential>,
}

impl ChainBuilder {
    /// Start a chain from literal seed records. No I/O is ever performed for
    /// the seed level.
    pub fn seed(seed: Vec<Record>) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn join(mut self, spec: JoinSpec) -> Self {
        self.levels.push(spec);
        self
    }

    /// Override the default abort-on-failure policy for this chain.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Basic-auth credential handed through to the transport on every call.
    pub fn credential(mut self, credential: BasicCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Validate the whole chain. Fails on empty seed, inconsistent seed
    /// shapes, forward references, unknown skip keys, and field collisions.
    pub fn build(self) -> Result<Chain, ExtractError> {
        if self.seed.is_empty() {
            return Err(ExtractError::Configuration(
                "chain seed must contain at least one record".to_string(),
            ));
        }

        // All seed records must expose the same field set so a placeholder
        // valid for one parent is valid for all of them.
        let mut available: Vec<String> =
            self.seed[0].field_names().map(str::to_string).collect();
        for record in &self.seed[1..] {
            let fields: Vec<&str> = record.field_names().collect();
            if fields != available.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(ExtractError::Configuration(
                    "seed records must all carry the same field names".to_string(),
                ));
            }
        }

        for (depth, spec) in self.levels.iter().enumerate() {
            for field in spec.referenced_fields() {
                if !available.iter().any(|f| f == field) {
                    return Err(ExtractError::Configuration(format!(
                        "level {depth} references '{{{field}}}' which no earlier level produces"
                    )));
                }
            }
            if let SkipPolicy::SkipIfParentFieldAbsent { keys } = &spec.skip {
                for key in keys {
                    if !available.iter().any(|f| f == key) {
                        return Err(ExtractError::Configuration(format!(
                            "level {depth} skip key '{key}' is not produced by earlier levels"
                        )));
                    }
                }
            }
            for name in &spec.field_names {
                if available.iter().any(|f| f == name) {
                    return Err(ExtractError::Configuration(format!(
                        "level {depth} output field '{name}' collides with an inherited field"
                    )));
                }
            }
            available.extend(spec.field_names.iter().cloned());
        }

        Ok(Chain {
            seed: self.seed,
            levels: self.levels,
            failure_policy: self.failure_policy,
            credential: self.credential,
        })
    }
}

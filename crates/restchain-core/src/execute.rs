//! Chain execution: lazy, ordered expansion of parent records
//!
//! Each level is a cursor over its parent: pull one parent record, substitute
//! its fields into the level's URL and params, call the transport, project
//! the response, and buffer the merged children. Output order is a pure
//! function of parent order and per-response tuple order.

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::chain::{Chain, JoinSpec, SkipPolicy};
use crate::error::{ExtractError, FailurePolicy};
use crate::record::Record;
use crate::transport::{BasicCredential, Transport};

/// How parent records are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// One call at a time, consumer-paced.
    #[default]
    Sequential,
    /// Fetch up to `workers` independent parent records per level in
    /// parallel, then emit buffered results in parent order. The output
    /// sequence is identical to sequential mode.
    Concurrent { workers: usize },
}

/// Per-execution options; the chain itself is immutable across runs.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub mode: ExecMode,
    pub cancel: CancelToken,
}

impl Chain {
    /// Run the chain lazily. Each call re-executes every HTTP request; there
    /// is no caching across restarts.
    pub fn execute<'a, T: Transport>(
        &'a self,
        transport: &'a T,
        options: ExecOptions,
    ) -> ExtractionStream<'a, T> {
        let mut source = Source::Seed(self.seed.clone().into_iter());
        for spec in &self.levels {
            source = Source::Level(Box::new(LevelIter {
                source,
                spec,
                transport,
                credential: self.credential.as_ref(),
                cancel: options.cancel.clone(),
                policy: self.failure_policy,
                mode: options.mode,
                pending: VecDeque::new(),
                deferred: None,
                failed: false,
            }));
        }
        ExtractionStream {
            source,
            cancel: options.cancel,
            finished: false,
        }
    }
}

enum Source<'a, T: Transport> {
    Seed(std::vec::IntoIter<Record>),
    Level(Box<LevelIter<'a, T>>),
}

impl<T: Transport> Source<'_, T> {
    fn next(&mut self) -> Option<Result<Record, ExtractError>> {
        match self {
            Self::Seed(records) => records.next().map(Ok),
            Self::Level(level) => level.next(),
        }
    }
}

/// Cursor state for one chain level: the parent source plus the buffer of
/// merged child records not yet consumed.
struct LevelIter<'a, T: Transport> {
    source: Source<'a, T>,
    spec: &'a JoinSpec,
    transport: &'a T,
    credential: Option<&'a BasicCredential>,
    cancel: CancelToken,
    policy: FailurePolicy,
    mode: ExecMode,
    pending: VecDeque<Record>,
    /// Error held back until earlier parents' buffered records are drained.
    deferred: Option<ExtractError>,
    failed: bool,
}

impl<T: Transport> LevelIter<'_, T> {
    /// Expand one parent record into its merged children.
    fn expand(&self, parent: &Record) -> Result<Vec<Record>, ExtractError> {
        if let SkipPolicy::SkipIfParentFieldAbsent { keys } = &self.spec.skip {
            if let Some(key) = keys.iter().find(|k| !parent.has_value(k)) {
                log::debug!("skipping call to '{}': no value for join key '{key}'", self.spec.url.raw());
                return Ok(Vec::new());
            }
        }
        if self.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let url = self.spec.url.render(parent)?;
        let params = self
            .spec
            .params
            .iter()
            .map(|(name, value)| Ok((name.clone(), value.render(parent)?)))
            .collect::<Result<Vec<_>, ExtractError>>()?;

        let response = self.transport.get(&url, &params, self.credential)?;
        let body: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| ExtractError::Projection(format!("invalid JSON response: {e}")))?;
        let children = self.spec.path.project(&body, &self.spec.field_names)?;

        Ok(children.iter().map(|c| parent.merged(c)).collect())
    }

    /// Buffer an expansion result, applying the failure policy. Returns an
    /// error that must end the stream once the buffer drains.
    fn absorb(&mut self, result: Result<Vec<Record>, ExtractError>) -> Option<ExtractError> {
        match result {
            Ok(children) => {
                self.pending.extend(children);
                None
            }
            Err(e) if e.is_policy_controlled() && self.policy == FailurePolicy::SkipAndWarn => {
                log::warn!("skipping parent record after failure: {e}");
                None
            }
            Err(e) => Some(e),
        }
    }

    fn refill_sequential(&mut self) -> bool {
        match self.source.next() {
            None => false,
            Some(Err(e)) => {
                self.deferred = Some(e);
                true
            }
            Some(Ok(parent)) => {
                let result = self.expand(&parent);
                if let Some(e) = self.absorb(result) {
                    self.deferred = Some(e);
                }
                true
            }
        }
    }

    fn refill_concurrent(&mut self, workers: usize) -> bool {
        let workers = workers.max(1);
        let mut batch = Vec::with_capacity(workers);
        let mut upstream = None;
        while batch.len() < workers {
            match self.source.next() {
                Some(Ok(parent)) => batch.push(parent),
                Some(Err(e)) => {
                    upstream = Some(e);
                    break;
                }
                None => break,
            }
        }
        if batch.is_empty() && upstream.is_none() {
            return false;
        }

        let results: Vec<Result<Vec<Record>, ExtractError>> =
            batch.par_iter().map(|parent| self.expand(parent)).collect();
        for result in results {
            if let Some(e) = self.absorb(result) {
                self.deferred = Some(e);
                return true;
            }
        }
        if let Some(e) = upstream {
            self.deferred = Some(e);
        }
        true
    }

    fn next(&mut self) -> Option<Result<Record, ExtractError>> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if let Some(e) = self.deferred.take() {
                self.failed = true;
                return Some(Err(e));
            }
            let refilled = match self.mode {
                ExecMode::Sequential => self.refill_sequential(),
                ExecMode::Concurrent { workers } => self.refill_concurrent(workers),
            };
            if !refilled {
                return None;
            }
        }
    }
}

/// Consumer-facing lazy stream of merged records.
///
/// Finite and restartable: obtain a fresh stream from [`Chain::execute`] to
/// re-run the chain. After the first error the stream is fused.
pub struct ExtractionStream<'a, T: Transport> {
    source: Source<'a, T>,
    cancel: CancelToken,
    finished: bool,
}

impl<T: Transport> Iterator for ExtractionStream<'_, T> {
    type Item = Result<Record, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        // Cancellation cuts ahead of any buffered records: already-emitted
        // records stay valid, nothing further is produced.
        if self.cancel.is_cancelled() {
            self.finished = true;
            return Some(Err(ExtractError::Cancelled));
        }
        match self.source.next() {
            None => {
                self.finished = true;
                None
            }
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            record => record,
        }
    }
}

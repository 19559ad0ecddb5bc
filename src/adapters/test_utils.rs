//! Shared test doubles for the collaborator traits
//!
//! `ScriptedSource` returns a fixed batch, a fixed error, or hangs past any
//! timeout. `ScriptedSink` records what it was asked to deliver and can be
//! switched into failure mode between cycles.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::errors::{DispatchError, DispatchResult, FetchError, FetchResult};
use crate::adapters::traits::{AlertSink, DeliveryHandle, FetchContext, Reply, ReplySource, SourceAdapter};
use crate::core::types::{CandidateRecord, ScoredCandidate, Source};

/// What a scripted source does when fetched
#[derive(Debug, Clone)]
pub enum SourceScript {
    Batch(Vec<CandidateRecord>),
    Fail(String),
    Hang(Duration),
    /// Return the batch after a delay
    Delayed(Duration, Vec<CandidateRecord>),
}

/// Source adapter with a fixed script
pub struct ScriptedSource {
    source: Source,
    script: Mutex<SourceScript>,
    calls: AtomicUsize,
    rounds: u32,
    /// Ledger snapshots received, one per fetch
    pub contexts: Arc<Mutex<Vec<HashSet<String>>>>,
}

impl ScriptedSource {
    pub fn new(source: Source, batch: Vec<CandidateRecord>) -> Self {
        Self::with_script(source, SourceScript::Batch(batch))
    }

    pub fn failing(source: Source, message: &str) -> Self {
        Self::with_script(source, SourceScript::Fail(message.to_string()))
    }

    pub fn hanging(source: Source, delay: Duration) -> Self {
        Self::with_script(source, SourceScript::Hang(delay))
    }

    pub fn with_script(source: Source, script: SourceScript) -> Self {
        Self {
            source,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            rounds: 1,
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_call_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn set_script(&self, script: SourceScript) {
        if let Ok(mut current) = self.script.lock() {
            *current = script;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(ctx.already_alerted.clone());
        }

        let script = self
            .script
            .lock()
            .map(|s| s.clone())
            .unwrap_or(SourceScript::Batch(Vec::new()));

        match script {
            SourceScript::Batch(batch) => Ok(batch),
            SourceScript::Fail(message) => Err(FetchError::Http(message)),
            SourceScript::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            SourceScript::Delayed(delay, batch) => {
                tokio::time::sleep(delay).await;
                Ok(batch)
            }
        }
    }

    fn call_rounds(&self) -> u32 {
        self.rounds
    }
}

/// Alert sink that records every dispatched asset id
#[derive(Default)]
pub struct ScriptedSink {
    fail: AtomicBool,
    next_handle: AtomicUsize,
    dispatched: Mutex<Vec<String>>,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Asset ids delivered successfully, in order
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AlertSink for ScriptedSink {
    async fn dispatch(&self, winner: &ScoredCandidate) -> DispatchResult<DeliveryHandle> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Rejected {
                status: 502,
                body: "scripted failure".to_string(),
            });
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut dispatched) = self.dispatched.lock() {
            dispatched.push(winner.record.asset_id.clone());
        }
        Ok(DeliveryHandle(id.to_string()))
    }
}

/// Reply source that hands out queued batches
#[derive(Default)]
pub struct ScriptedReplies {
    batches: VecDeque<Vec<Reply>>,
}

impl ScriptedReplies {
    pub fn new(batches: Vec<Vec<Reply>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl ReplySource for ScriptedReplies {
    /// The first queued batch counts as the startup backlog
    async fn skip_backlog(&mut self) -> FetchResult<usize> {
        Ok(self.batches.pop_front().map_or(0, |batch| batch.len()))
    }

    async fn poll_replies(&mut self) -> FetchResult<Vec<Reply>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

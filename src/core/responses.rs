//! Response tracker
//!
//! Correlates human YES/NO replies with dispatched alerts. Decisions are
//! logged only; no order is ever placed. An unthreaded reply can only answer
//! an alert sent before it.

use std::collections::VecDeque;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::adapters::traits::{DeliveryHandle, Reply, ReplySource};
use crate::core::orchestrator::AlertNotice;

/// Open alerts kept for correlation; oldest dropped first
pub const MAX_OPEN_ALERTS: usize = 50;

/// Parsed human answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Skip,
}

impl Decision {
    /// Accepts a whole-message `yes`/`no` in any case, or the `/yes` and
    /// `/no` commands with an optional `@bot` suffix
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let word = match text.strip_prefix('/') {
            Some(command) => command.split('@').next().unwrap_or_default(),
            None => text,
        };
        if word.eq_ignore_ascii_case("yes") {
            Some(Decision::Approve)
        } else if word.eq_ignore_ascii_case("no") {
            Some(Decision::Skip)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Skip => "skip",
        }
    }
}

/// A reply matched to the alert it answers
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDecision {
    pub alert: AlertNotice,
    pub decision: Decision,
}

/// Bounded FIFO of alerts awaiting an answer
#[derive(Debug)]
pub struct ResponseTracker {
    open: VecDeque<AlertNotice>,
    /// Latest decisions, same bound as `open`
    decided: VecDeque<ResolvedDecision>,
    capacity: usize,
}

impl Default for ResponseTracker {
    fn default() -> Self {
        Self::new(MAX_OPEN_ALERTS)
    }
}

impl ResponseTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            open: VecDeque::with_capacity(capacity),
            decided: VecDeque::new(),
            capacity,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Decisions recorded so far, oldest first
    pub fn recent_decisions(&self) -> impl Iterator<Item = &ResolvedDecision> {
        self.decided.iter()
    }

    pub fn track(&mut self, notice: AlertNotice) {
        while self.open.len() >= self.capacity {
            if let Some(dropped) = self.open.pop_front() {
                debug!(asset_id = %dropped.asset_id, "Dropping unanswered alert");
            }
        }
        self.open.push_back(notice);
    }

    /// Match a reply to an open alert and close it.
    ///
    /// A threaded reply resolves the alert it points at. An unthreaded one
    /// resolves the most recent open alert sent before the reply. Unparseable
    /// text and unknown threads resolve nothing.
    pub fn resolve(&mut self, reply: &Reply) -> Option<ResolvedDecision> {
        let decision = Decision::parse(&reply.text)?;

        let index = match &reply.reply_to {
            Some(handle) => self.position(handle)?,
            None => self.open.iter().rposition(|alert| sent_before(alert, reply))?,
        };
        let alert = self.open.remove(index)?;

        let resolved = ResolvedDecision { alert, decision };
        if self.decided.len() >= self.capacity {
            self.decided.pop_front();
        }
        self.decided.push_back(resolved.clone());
        Some(resolved)
    }

    fn position(&self, handle: &DeliveryHandle) -> Option<usize> {
        self.open.iter().position(|a| &a.handle == handle)
    }
}

/// Without comparable ids on both sides, ordering is unknown and the alert stays eligible.
fn sent_before(alert: &AlertNotice, reply: &Reply) -> bool {
    match (alert.handle.sequence(), reply.message_id) {
        (Some(alert_id), Some(reply_id)) => alert_id < reply_id,
        _ => true,
    }
}

/// Drain alert notices and poll replies until shutdown.
///
/// Replies already queued at startup are skipped. Returns the tracker so the
/// caller can inspect what was still open and what was decided.
pub async fn run_response_loop<R: ReplySource>(
    mut replies: R,
    mut notices: mpsc::Receiver<AlertNotice>,
    poll_interval: std::time::Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> ResponseTracker {
    let mut tracker = ResponseTracker::default();
    match replies.skip_backlog().await {
        Ok(skipped) => debug!(skipped, "Reply backlog skipped"),
        Err(e) => warn!(error = %e, "Could not skip reply backlog"),
    }
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(poll_ms = poll_interval.as_millis() as u64, "Response tracker started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!(open_alerts = tracker.open_count(), "Response tracker shutting down");
                break;
            }
            Some(notice) = notices.recv() => {
                debug!(asset_id = %notice.asset_id, handle = %notice.handle, "Tracking alert");
                tracker.track(notice);
            }
            _ = ticker.tick() => {
                // Pick up notices queued while the poll was pending
                while let Ok(notice) = notices.try_recv() {
                    tracker.track(notice);
                }
                if tracker.open_count() == 0 {
                    continue;
                }
                match replies.poll_replies().await {
                    Ok(batch) => {
                        apply_replies(&mut tracker, &batch);
                    }
                    Err(e) => warn!(error = %e, "Reply poll failed"),
                }
            }
        }
    }
    tracker
}

/// Apply a batch of replies in arrival order; returns resolved decisions.
pub fn apply_replies(tracker: &mut ResponseTracker, batch: &[Reply]) -> Vec<ResolvedDecision> {
    let mut resolved = Vec::new();
    for reply in batch {
        match tracker.resolve(reply) {
            Some(r) => {
                info!(
                    asset_id = %r.alert.asset_id,
                    symbol = %r.alert.symbol,
                    handle = %r.alert.handle,
                    decision = r.decision.as_str(),
                    "Operator decision recorded"
                );
                resolved.push(r);
            }
            None => debug!(text = %reply.text, "Reply ignored"),
        }
    }
    resolved
}

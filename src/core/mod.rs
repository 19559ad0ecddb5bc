//! Core module - candidate model, scoring, dedup, cooldown, selection, cycle driver
//!
//! # Module Architecture
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! so the public API only changes when a type is added below on purpose.
//!
//! ## Usage
//! ```ignore
//! use token_scanner::core::{ScanOrchestrator, ScoringPipeline, CandidateRecord};
//! ```

pub mod cooldown;
pub mod ledger;
pub mod orchestrator;
pub mod responses;
pub mod scheduler;
pub mod scoring;
pub mod selector;
pub mod types;

// Candidate model
pub use types::{BuySellRatio, CandidateRecord, ScoredCandidate, Source};

// Filter and scoring pipeline
pub use scoring::{HardFilters, ModeRules, ScoringPipeline, ScoringProfile, SignalWeights, SourceMode};

// Deduplication and cooldown state
pub use cooldown::CooldownGate;
pub use ledger::{DedupLedger, DEFAULT_LEDGER_CAPACITY};

// Selection
pub use selector::{compare, select_winner};

// Cycle driver
pub use orchestrator::{
    AlertNotice, CycleOutcome, CycleReport, OrchestratorConfig, ScanOrchestrator, ScanPhase,
};

// Periodic tasks
pub use responses::{apply_replies, run_response_loop, Decision, ResolvedDecision, ResponseTracker, MAX_OPEN_ALERTS};
pub use scheduler::{run_scan_loop, try_start_cycle, HealthSnapshot, HealthState, SharedOrchestrator};

//! Run-state tracking for the research pipeline.
//!
//! Every schedulable piece of the pipeline — each workflow step, the summary
//! stage, the draft-email stage — is a *unit of work* with its own state
//! slot. The [`Coordinator`] owns the slots, enforces at-most-one concurrent
//! execution per unit, and sequences the queued downstream stages.

mod coordinator;

pub use coordinator::{Coordinator, CoordinatorBuilder, Dispatch, DEFAULT_TICK_INTERVAL};

use std::time::Instant;

/// Identifier of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitId {
    Step(usize),
    Summary,
    DraftEmail,
}

/// Lifecycle of a unit. `Queued` is only ever entered by the summary and
/// draft-email stages while they wait for the pipeline to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Queued,
    Running,
    Done,
    Failed,
}

impl RunStatus {
    /// Done or Failed: the unit has run and holds an outcome.
    pub fn is_settled(self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }
}

/// Mutable state of one unit. Each background worker writes only its own
/// slot; the control side reads all of them.
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub started_at: Option<Instant>,
    pub result: String,
    pub error: Option<String>,
    /// One-shot edge marker: set when the unit finishes, cleared by
    /// `reconcile` once the whole pipeline is idle.
    pub just_completed: bool,
}

impl RunState {
    pub(crate) fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            started_at: None,
            result: String::new(),
            error: None,
            just_completed: false,
        }
    }
}

/// Read-only view of one unit for presentation layers.
#[derive(Debug, Clone)]
pub struct UnitSnapshot {
    pub unit: UnitId,
    pub name: String,
    pub status: RunStatus,
    pub result: String,
    pub error: Option<String>,
}

/// Queued downstream intents. Process-lifetime only.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PipelineQueue {
    pub summary_queued: bool,
    pub draft_email_queued: bool,
}

impl PipelineQueue {
    pub(crate) fn is_pending(self) -> bool {
        self.summary_queued || self.draft_email_queued
    }
}

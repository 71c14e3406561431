//! # dealscout-core
//!
//! Core library for DealScout, a company-research assistant. Given a company
//! URL it runs a fixed workflow of research steps — each a web search whose
//! results are analyzed by a language model — then synthesizes a summary and
//! drafts an outreach email from the findings.
//!
//! The interesting part is the [`pipeline`] module: a run-state coordinator
//! that tracks per-unit status, dispatches background work without blocking
//! the caller, refuses overlapping invocations of the same unit, isolates
//! per-step failures, and sequences the summary and draft-email stages
//! behind the steps via queued intents.
//!
//! The leaves are deliberately thin: [`search`] and [`llm`] define narrow
//! client traits (with HTTP implementations and deterministic mocks), the
//! [`cache`] memoizes results across process restarts, and [`workflow`]
//! holds the step definitions and prompt assembly.

pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod workflow;

pub use cache::ResultCache;
pub use clients::ResearchClients;
pub use error::{ConfigError, DispatchError, ModelError, SearchError, StepError};
pub use pipeline::{Coordinator, Dispatch, RunStatus, UnitId, UnitSnapshot};
pub use workflow::{WorkflowStep, default_workflow};

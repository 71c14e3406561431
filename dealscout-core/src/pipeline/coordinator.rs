//! The run-state coordinator.
//!
//! Control-side callers (the CLI, a UI) own a [`Coordinator`] and issue
//! `dispatch` / `enqueue_*` / `tick` against it. Each dispatched unit runs on
//! its own background task and writes only its own pre-allocated slot, so
//! concurrent completions never conflict. The subject identifier is copied
//! into the worker's payload at dispatch time; an edit while a unit is in
//! flight cannot retarget it.
//!
//! A single ticker task polls at a fixed cadence while anything is active,
//! draining queued downstream stages once nothing is running, and parks
//! itself when the pipeline is fully idle.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::clients::ResearchClients;
use crate::error::DispatchError;
use crate::llm::{self, CompletionRequest};
use crate::workflow::{self, WorkflowStep, prompts};

use super::{PipelineQueue, RunState, RunStatus, UnitId, UnitSnapshot};

/// Polling cadence while the pipeline is active.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a dispatch attempt that passed the synchronous checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    /// The unit was already running; nothing was scheduled.
    AlreadyRunning,
}

type UnitWork = Pin<Box<dyn Future<Output = Result<String, String>> + Send>>;

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    clients: ResearchClients,
    cache: Arc<ResultCache>,
    steps: Vec<WorkflowStep>,
    step_slots: Vec<Arc<RwLock<RunState>>>,
    summary_slot: Arc<RwLock<RunState>>,
    draft_email_slot: Arc<RwLock<RunState>>,
    queue: StdMutex<PipelineQueue>,
    subject: StdRwLock<String>,
    ticker_running: AtomicBool,
    tick_interval: Duration,
    chain_draft_email: bool,
}

/// Construction-time options for a [`Coordinator`].
pub struct CoordinatorBuilder {
    clients: ResearchClients,
    cache: Arc<ResultCache>,
    steps: Vec<WorkflowStep>,
    tick_interval: Duration,
    chain_draft_email: bool,
}

impl CoordinatorBuilder {
    /// Adjust the polling cadence. Tests drive this down to milliseconds.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Disable the draft-email stage; the pipeline then ends at the summary.
    pub fn without_draft_email(mut self) -> Self {
        self.chain_draft_email = false;
        self
    }

    pub fn build(self) -> Coordinator {
        let step_slots = self
            .steps
            .iter()
            .map(|_| Arc::new(RwLock::new(RunState::idle())))
            .collect();
        Coordinator {
            inner: Arc::new(Inner {
                clients: self.clients,
                cache: self.cache,
                steps: self.steps,
                step_slots,
                summary_slot: Arc::new(RwLock::new(RunState::idle())),
                draft_email_slot: Arc::new(RwLock::new(RunState::idle())),
                queue: StdMutex::new(PipelineQueue::default()),
                subject: StdRwLock::new(String::new()),
                ticker_running: AtomicBool::new(false),
                tick_interval: self.tick_interval,
                chain_draft_email: self.chain_draft_email,
            }),
        }
    }
}

impl Coordinator {
    pub fn builder(
        clients: ResearchClients,
        cache: Arc<ResultCache>,
        steps: Vec<WorkflowStep>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            clients,
            cache,
            steps,
            tick_interval: DEFAULT_TICK_INTERVAL,
            chain_draft_email: true,
        }
    }

    pub fn new(clients: ResearchClients, cache: Arc<ResultCache>, steps: Vec<WorkflowStep>) -> Self {
        Self::builder(clients, cache, steps).build()
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.inner.steps
    }

    pub fn set_subject(&self, subject: impl Into<String>) {
        let mut guard = self.inner.subject.write().unwrap_or_else(|p| p.into_inner());
        *guard = subject.into();
    }

    pub fn subject(&self) -> String {
        self.inner
            .subject
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Start one unit of work. Rejected synchronously when the subject is
    /// empty; a no-op when the unit is already running. Otherwise the slot
    /// flips to Running and the work is scheduled on a background task with
    /// the subject bound into its payload.
    pub async fn dispatch(&self, unit: UnitId) -> Result<Dispatch, DispatchError> {
        let subject = self.subject();
        if subject.trim().is_empty() {
            return Err(DispatchError::EmptySubject);
        }
        let slot = self.inner.slot(unit)?;

        {
            let mut state = slot.write().await;
            if state.status == RunStatus::Running {
                info!(unit = %self.inner.unit_name(unit), "dispatch ignored; already running");
                return Ok(Dispatch::AlreadyRunning);
            }
            state.status = RunStatus::Running;
            state.started_at = Some(Instant::now());
            state.just_completed = false;
        }

        let work = self.inner.work_for(unit, subject).await;
        let slot = Arc::clone(slot);
        let name = self.inner.unit_name(unit);
        info!(unit = %name, "unit dispatched");

        tokio::spawn(async move {
            let outcome = work.await;
            let mut state = slot.write().await;
            state.started_at = None;
            state.just_completed = true;
            match outcome {
                Ok(text) => {
                    state.result = text;
                    state.error = None;
                    state.status = RunStatus::Done;
                    info!(unit = %name, "unit finished");
                }
                Err(message) => {
                    state.result.clear();
                    state.error = Some(message.clone());
                    state.status = RunStatus::Failed;
                    warn!(unit = %name, error = %message, "unit failed");
                }
            }
        });

        self.ensure_ticker();
        Ok(Dispatch::Started)
    }

    /// Queue the summary stage; it dispatches on a later tick, once nothing
    /// is running.
    pub async fn enqueue_summary(&self) {
        {
            let mut queue = self.inner.queue.lock().unwrap_or_else(|p| p.into_inner());
            queue.summary_queued = true;
        }
        self.mark_queued(&self.inner.summary_slot).await;
        self.ensure_ticker();
    }

    /// Queue the draft-email stage independently of the summary.
    pub async fn enqueue_draft_email(&self) {
        {
            let mut queue = self.inner.queue.lock().unwrap_or_else(|p| p.into_inner());
            queue.draft_email_queued = true;
        }
        self.mark_queued(&self.inner.draft_email_slot).await;
        self.ensure_ticker();
    }

    /// The compound "analyze all" operation: every step dispatched up front,
    /// then the summary queued behind them (which chains the draft email).
    pub async fn analyze_all(&self) -> Result<(), DispatchError> {
        if self.subject().trim().is_empty() {
            return Err(DispatchError::EmptySubject);
        }
        for index in 0..self.inner.steps.len() {
            self.dispatch(UnitId::Step(index)).await?;
        }
        self.enqueue_summary().await;
        Ok(())
    }

    /// One evaluation of the queued-intent logic: while anything is running
    /// this is a no-op; otherwise the next queued stage is dispatched.
    /// Dispatching the summary is the point where the draft-email intent is
    /// recorded, so the email always sequences after the summary.
    pub async fn tick(&self) {
        if self.any_running().await {
            return;
        }
        let next = {
            let mut queue = self.inner.queue.lock().unwrap_or_else(|p| p.into_inner());
            if queue.summary_queued {
                queue.summary_queued = false;
                if self.inner.chain_draft_email {
                    queue.draft_email_queued = true;
                }
                Some(UnitId::Summary)
            } else if queue.draft_email_queued {
                queue.draft_email_queued = false;
                Some(UnitId::DraftEmail)
            } else {
                None
            }
        };
        let Some(unit) = next else { return };
        if unit == UnitId::Summary && self.inner.chain_draft_email {
            self.mark_queued(&self.inner.draft_email_slot).await;
        }
        if let Err(err) = self.dispatch(unit).await {
            warn!(unit = %self.inner.unit_name(unit), %err, "queued stage dropped");
        }
    }

    /// One-shot edge detection for "the pipeline just went fully idle":
    /// clears every stale just-completed marker and reports whether any were
    /// set. Returns false while anything is running or queued.
    pub async fn reconcile(&self) -> bool {
        if self.any_running().await || self.queue_pending() {
            return false;
        }
        let mut cleared = false;
        for slot in self.inner.all_slots() {
            let mut state = slot.write().await;
            if state.just_completed {
                state.just_completed = false;
                cleared = true;
            }
        }
        cleared
    }

    pub async fn any_running(&self) -> bool {
        for slot in self.inner.all_slots() {
            if slot.read().await.status == RunStatus::Running {
                return true;
            }
        }
        false
    }

    /// Nothing running and nothing queued.
    pub async fn is_settled(&self) -> bool {
        !self.any_running().await && !self.queue_pending()
    }

    pub async fn unit_state(&self, unit: UnitId) -> Result<UnitSnapshot, DispatchError> {
        let slot = self.inner.slot(unit)?;
        let state = slot.read().await;
        Ok(self.inner.snapshot_of(unit, &state))
    }

    /// Cloned per-unit view for presentation layers, steps first.
    pub async fn snapshot(&self) -> Vec<UnitSnapshot> {
        let mut units = Vec::with_capacity(self.inner.steps.len() + 2);
        for index in 0..self.inner.steps.len() {
            units.push(UnitId::Step(index));
        }
        units.push(UnitId::Summary);
        units.push(UnitId::DraftEmail);

        let mut snapshots = Vec::with_capacity(units.len());
        for unit in units {
            if let Ok(slot) = self.inner.slot(unit) {
                let state = slot.read().await;
                snapshots.push(self.inner.snapshot_of(unit, &state));
            }
        }
        snapshots
    }

    fn queue_pending(&self) -> bool {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_pending()
    }

    async fn mark_queued(&self, slot: &Arc<RwLock<RunState>>) {
        let mut state = slot.write().await;
        if state.status != RunStatus::Running {
            state.status = RunStatus::Queued;
        }
    }

    /// Spawn the ticker unless one is already alive. The ticker drains
    /// queued intents while active and parks itself once fully idle; a
    /// dispatch racing with its shutdown re-arms it here or in the respawn
    /// check at the bottom of the loop.
    fn ensure_ticker(&self) {
        if self
            .inner
            .ticker_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                let mut interval = tokio::time::interval(coordinator.inner.tick_interval);
                interval.tick().await; // the first fire is immediate; skip it
                loop {
                    interval.tick().await;
                    coordinator.tick().await;
                    if coordinator.is_settled().await {
                        coordinator.reconcile().await;
                        break;
                    }
                }
                coordinator.inner.ticker_running.store(false, Ordering::SeqCst);
                // New work may have arrived between the idle check and the
                // flag store; re-arm instead of stranding it.
                let active = !coordinator.is_settled().await;
                if active
                    && coordinator
                        .inner
                        .ticker_running
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    continue;
                }
                break;
            }
        });
    }
}

impl Inner {
    fn slot(&self, unit: UnitId) -> Result<&Arc<RwLock<RunState>>, DispatchError> {
        match unit {
            UnitId::Step(index) => self
                .step_slots
                .get(index)
                .ok_or(DispatchError::UnknownStep(index)),
            UnitId::Summary => Ok(&self.summary_slot),
            UnitId::DraftEmail => Ok(&self.draft_email_slot),
        }
    }

    fn all_slots(&self) -> impl Iterator<Item = &Arc<RwLock<RunState>>> {
        self.step_slots
            .iter()
            .chain([&self.summary_slot, &self.draft_email_slot])
    }

    fn unit_name(&self, unit: UnitId) -> String {
        match unit {
            UnitId::Step(index) => self
                .steps
                .get(index)
                .map(|step| step.name.clone())
                .unwrap_or_else(|| format!("step {index}")),
            UnitId::Summary => "Summary".to_string(),
            UnitId::DraftEmail => "Draft Email".to_string(),
        }
    }

    fn snapshot_of(&self, unit: UnitId, state: &RunState) -> UnitSnapshot {
        UnitSnapshot {
            unit,
            name: self.unit_name(unit),
            status: state.status,
            result: state.result.clone(),
            error: state.error.clone(),
        }
    }

    /// Build the unit's background work with every input bound now: the
    /// subject, the step definition, and (for downstream stages) the
    /// upstream results as they stand at dispatch time.
    async fn work_for(&self, unit: UnitId, subject: String) -> UnitWork {
        let clients = self.clients.clone();
        let cache = Arc::clone(&self.cache);
        match unit {
            UnitId::Step(index) => {
                let step = self.steps[index].clone();
                Box::pin(async move {
                    workflow::execute_step(
                        clients.search.as_ref(),
                        clients.model.as_ref(),
                        &cache,
                        &step,
                        &subject,
                    )
                    .await
                    .map_err(|err| err.to_string())
                })
            }
            UnitId::Summary => {
                let sections = self.collect_sections().await;
                Box::pin(async move {
                    let prompt = prompts::summary_prompt(&sections);
                    llm::complete_cached(
                        clients.model.as_ref(),
                        &cache,
                        CompletionRequest::new(prompt),
                    )
                    .await
                    .map_err(|err| err.to_string())
                })
            }
            UnitId::DraftEmail => {
                let summary = self.summary_slot.read().await.result.clone();
                Box::pin(async move {
                    let prompt = prompts::draft_email_prompt(&summary);
                    llm::complete_cached(
                        clients.model.as_ref(),
                        &cache,
                        CompletionRequest::new(prompt),
                    )
                    .await
                    .map_err(|err| err.to_string())
                })
            }
        }
    }

    /// Findings the summary stage will see: Done steps contribute their
    /// result, Failed steps an explicit placeholder, untouched steps nothing.
    async fn collect_sections(&self) -> Vec<(String, String)> {
        let mut sections = Vec::new();
        for (step, slot) in self.steps.iter().zip(&self.step_slots) {
            let state = slot.read().await;
            match state.status {
                RunStatus::Done => sections.push((step.name.clone(), state.result.clone())),
                RunStatus::Failed => {
                    let message = state.error.as_deref().unwrap_or("unknown error");
                    sections.push((
                        step.name.clone(),
                        prompts::failed_section(&step.name, message),
                    ));
                }
                _ => {}
            }
        }
        sections
    }
}

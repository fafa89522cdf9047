//! Operator conversations
//!
//! Turns inbound events into steps: every event passes the [`Gatekeeper`],
//! callbacks move the per-operator [`ConversationState`], and text is
//! validated against the current state before anything runs.

mod actions;
mod events;
mod gate;
mod registry;
mod state;

pub use actions::Actions;
pub use events::{CallbackAction, InboundEvent};
pub use gate::{Admission, Gatekeeper, ACCESS_DENIED};
pub use registry::TaskRegistry;
pub use state::{ConversationState, Intent};

use crate::alerts::MetricsSampler;
use crate::domain::OperatorId;
use crate::error::DomainError;
use crate::services::render_snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Refresh period of the live metrics view
pub const METRICS_REFRESH: Duration = Duration::from_secs(2);

/// What the caller should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Actor is not authorized
    Denied(&'static str),
    /// Show a question and wait for text
    Prompt(String),
    /// Input was rejected; the state is unchanged
    Retry { error: DomainError, prompt: String },
    /// Input was accepted
    Run(Intent),
    /// Pending input and background work dropped
    Cancelled { stopped_task: bool },
    /// Start the live metrics view for this operator
    WatchMetrics,
    /// Live metrics view stopped
    MetricsStopped { stopped_task: bool },
}

/// Conversation driver shared by all operators
pub struct Session {
    gate: Gatekeeper,
    states: Mutex<HashMap<OperatorId, ConversationState>>,
    tasks: TaskRegistry,
}

impl Session {
    pub fn new(gate: Gatekeeper) -> Self {
        Self {
            gate,
            states: Mutex::new(HashMap::new()),
            tasks: TaskRegistry::new(),
        }
    }

    /// Background tasks owned by operators
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Current state of an operator
    pub async fn state(&self, operator: OperatorId) -> ConversationState {
        self.states
            .lock()
            .await
            .get(&operator)
            .copied()
            .unwrap_or_default()
    }

    async fn set_state(&self, operator: OperatorId, state: ConversationState) {
        let mut states = self.states.lock().await;
        if state == ConversationState::Idle {
            states.remove(&operator);
        } else {
            states.insert(operator, state);
        }
    }

    /// Process one inbound event
    pub async fn handle(&self, event: &InboundEvent) -> Step {
        if let Admission::Denied(reason) = self.gate.admit(event).await {
            return Step::Denied(reason);
        }

        let actor = event.actor();
        match event {
            InboundEvent::Callback { data, .. } => self.on_callback(actor, data).await,
            InboundEvent::Text { text, .. } => self.on_text(actor, text).await,
        }
    }

    async fn on_callback(&self, actor: OperatorId, data: &str) -> Step {
        let action = match data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(error) => {
                log::warn!("Unknown callback {:?} from {}", data, actor);
                return Step::Retry {
                    error,
                    prompt: self.state(actor).await.prompt(),
                };
            }
        };

        match action {
            CallbackAction::Ask(state) => {
                self.tasks.cancel_and_await(actor).await;
                self.set_state(actor, state).await;
                Step::Prompt(state.prompt())
            }
            CallbackAction::Cancel => {
                let stopped_task = self.tasks.cancel_and_await(actor).await;
                self.set_state(actor, ConversationState::Idle).await;
                Step::Cancelled { stopped_task }
            }
            CallbackAction::WatchMetrics => {
                self.tasks.cancel_and_await(actor).await;
                self.set_state(actor, ConversationState::Idle).await;
                Step::WatchMetrics
            }
            CallbackAction::StopMetrics => {
                let stopped_task = self.tasks.cancel_and_await(actor).await;
                self.set_state(actor, ConversationState::Idle).await;
                Step::MetricsStopped { stopped_task }
            }
            CallbackAction::Perform(intent) => {
                self.tasks.cancel_and_await(actor).await;
                self.set_state(actor, ConversationState::Idle).await;
                Step::Run(intent)
            }
        }
    }

    async fn on_text(&self, actor: OperatorId, text: &str) -> Step {
        let state = self.state(actor).await;
        match state.accept(text) {
            Ok(intent) => {
                self.set_state(actor, state.after_accept()).await;
                Step::Run(intent)
            }
            Err(error) => Step::Retry {
                error,
                prompt: state.prompt(),
            },
        }
    }

    /// Drop every conversation and stop all background tasks
    pub async fn shutdown(&self) {
        self.states.lock().await.clear();
        let stopped = self.tasks.cancel_all().await;
        if stopped > 0 {
            log::info!("Stopped {} background task(s)", stopped);
        }
    }
}

/// Emit a rendered usage snapshot every `every` until cancelled
///
/// Stops early when sampling fails.
pub async fn stream_metrics<F>(
    sampler: Arc<dyn MetricsSampler>,
    every: Duration,
    cancel: CancellationToken,
    mut emit: F,
) where
    F: FnMut(String) + Send,
{
    loop {
        match sampler.sample().await {
            Ok(usage) => emit(render_snapshot(&usage, chrono::Local::now())),
            Err(e) => {
                log::warn!("Live metrics stopped: {}", e);
                return;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(every) => {}
        }
    }
}

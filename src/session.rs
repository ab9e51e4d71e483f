use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DemoError, FlowError};
use crate::flow::{DemoFlow, Rejected, Transition};
use crate::models::{Banner, GenerationAssets, GenerationRequest, Locale, SessionSnapshot};
use crate::renderer::PreviewPanel;

/// One session behind its own lock, so compiling in one session never
/// blocks the others.
pub type SessionHandle = Arc<Mutex<DemoSession>>;

pub type SessionStore = Arc<RwLock<HashMap<Uuid, SessionHandle>>>;

/// Proof that a generation was started for a particular session epoch.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub session: Uuid,
    epoch: u64,
    alive: Arc<AtomicBool>,
}

impl GenerationTicket {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct DemoSession {
    id: Uuid,
    flow: DemoFlow,
    alive: Arc<AtomicBool>,
    /// Bumped on every submit and restart; results from older epochs are stale.
    epoch: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DemoSession {
    pub fn new(source: Option<String>, locale: Option<Locale>) -> Self {
        let flow = match source {
            Some(source) => DemoFlow::new(source, locale.unwrap_or_default()),
            None => {
                let mut flow = DemoFlow::default();
                if let Some(locale) = locale {
                    flow = flow.set_locale(locale).unwrap_or_else(|r| r.flow);
                }
                flow
            }
        };
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            flow,
            alive: Arc::new(AtomicBool::new(true)),
            epoch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn flow(&self) -> &DemoFlow {
        &self.flow
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Clears liveness; in-flight generations for this session are discarded.
    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Runs a consuming transition in place. A rejected transition leaves
    /// the previous state untouched.
    pub fn apply(&mut self, transition: impl FnOnce(DemoFlow) -> Transition) -> Result<(), FlowError> {
        let flow = std::mem::take(&mut self.flow);
        match transition(flow) {
            Ok(next) => {
                self.flow = next;
                self.updated_at = Utc::now();
                Ok(())
            }
            Err(Rejected { flow, error }) => {
                self.flow = flow;
                Err(error)
            }
        }
    }

    pub fn restart(&mut self) {
        self.epoch += 1;
        let flow = std::mem::take(&mut self.flow);
        self.flow = flow.restart();
        self.updated_at = Utc::now();
    }

    pub fn begin_generation(&mut self) -> Result<(GenerationRequest, GenerationTicket), FlowError> {
        let flow = std::mem::take(&mut self.flow);
        match flow.submit() {
            Ok((next, request)) => {
                self.flow = next;
                self.epoch += 1;
                self.updated_at = Utc::now();
                let ticket = GenerationTicket {
                    session: self.id,
                    epoch: self.epoch,
                    alive: self.alive.clone(),
                };
                Ok((request, ticket))
            }
            Err(Rejected { flow, error }) => {
                self.flow = flow;
                Err(error)
            }
        }
    }

    /// Applies a finished generation unless the session was closed or has
    /// moved on since the ticket was issued.
    pub fn finish_generation(
        &mut self,
        ticket: &GenerationTicket,
        outcome: Result<GenerationAssets, DemoError>,
    ) -> Result<(), FlowError> {
        if !ticket.is_alive() {
            warn!(session = %ticket.session, "🗑️ Discarding generation result for closed session");
            return Err(FlowError::Gone);
        }
        if ticket.epoch != self.epoch {
            warn!(session = %ticket.session, "🗑️ Discarding stale generation result");
            return Err(FlowError::InvalidTransition {
                action: "complete a stale generation",
                state: self.flow.state_name(),
            });
        }
        self.apply(|flow| flow.complete(outcome))?;
        info!(session = %self.id, state = self.flow.state_name(), "🔄 Generation applied");
        Ok(())
    }

    /// Renders the live preview; `None` outside step 3.
    pub fn preview(&mut self) -> Option<PreviewPanel> {
        self.flow.renderer_mut().map(|r| r.render())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let draft = self.flow.draft();
        let assets = self.flow.assets();
        SessionSnapshot {
            id: self.id,
            step: self.flow.step(),
            state: self.flow.state_name(),
            source: draft.source.clone(),
            locale: draft.locale,
            banner: self.flow.banner().map(|b| Banner {
                kind: b.kind,
                message: b.message.clone(),
            }),
            result: assets.map(|a| a.result.clone()),
            mock_data: assets.map(|a| a.mock_data.clone()),
            renderer: self.flow.renderer().map(|r| r.status()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

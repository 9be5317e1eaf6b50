//! In-process notifications for scout runs.
//!
//! The caller owns a [`NotificationBus`] and hands it to the orchestrator.
//! Listeners run synchronously in subscription order. A listener that
//! returns an error or panics is logged and the remaining listeners still
//! run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use artcrm_core::Category;

use crate::types::SourceKind;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

type Listener = Box<dyn Fn(&ScoutEvent) -> Result<(), ListenerError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutCompleted {
    pub city: String,
    pub country: String,
    pub total_found: usize,
    pub total_inserted: usize,
    pub results_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoutEvent {
    Started {
        city: String,
        country: String,
        categories: Vec<Category>,
    },
    ContactCreated {
        contact_id: i64,
        name: String,
        source: SourceKind,
    },
    Completed(ScoutCompleted),
}

impl ScoutEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ScoutEvent::Started { .. } => "scout_started",
            ScoutEvent::ContactCreated { .. } => "contact_created",
            ScoutEvent::Completed(_) => "scout_completed",
        }
    }
}

#[derive(Default)]
pub struct NotificationBus {
    listeners: Vec<(String, Listener)>,
}

impl NotificationBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, name: impl Into<String>, listener: F)
    where
        F: Fn(&ScoutEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.push((name.into(), Box::new(listener)));
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers `event` to every listener.
    pub fn emit(&self, event: &ScoutEvent) {
        for (name, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        listener = %name,
                        event = event.name(),
                        error = %e,
                        "notification listener failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        listener = %name,
                        event = event.name(),
                        "notification listener panicked"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.listeners.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("NotificationBus")
            .field("listeners", &names)
            .finish()
    }
}

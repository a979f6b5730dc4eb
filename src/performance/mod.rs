//! Session-scoped latency and outcome bookkeeping.
//!
//! Purely observational: nothing here returns an error to the caller, and
//! persistence problems are logged and dropped.

pub mod store;

use crate::intent::{Entities, Intent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub use store::{JsonFileMetricsStore, MemoryMetricsStore, MetricsStore, MetricsStoreError};

pub const TIMER_RECOGNITION: &str = "recognition";
pub const TIMER_AI: &str = "ai";
pub const TIMER_SEARCH: &str = "search";
pub const TIMER_TOTAL: &str = "total";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: DateTime<Utc>,
    pub transcript: String,
    pub intent: Intent,
    pub entities: Entities,
    pub success: bool,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub message: String,
    pub context: Value,
}

/// Everything recorded for one session, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Completed timer durations in milliseconds, by timer name
    pub timers: BTreeMap<String, Vec<u64>>,
    pub commands: Vec<CommandRecord>,
    pub errors: Vec<ErrorRecord>,
    pub cart_value: f64,
}

impl SessionMetrics {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            ended_at: None,
            timers: BTreeMap::new(),
            commands: Vec::new(),
            errors: Vec::new(),
            cart_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerStats {
    pub count: usize,
    pub average_ms: f64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub session_id: Option<String>,
    pub total_commands: usize,
    pub successful_commands: usize,
    pub success_rate: f64,
    pub average_confidence: f64,
    pub timers: BTreeMap<String, TimerStats>,
    pub errors_by_category: BTreeMap<String, usize>,
    pub intent_counts: BTreeMap<String, usize>,
    pub cart_value: f64,
}

impl AggregateMetrics {
    fn from_session(session: Option<&SessionMetrics>) -> Self {
        let Some(session) = session else {
            return Self {
                session_id: None,
                total_commands: 0,
                successful_commands: 0,
                success_rate: 0.0,
                average_confidence: 0.0,
                timers: BTreeMap::new(),
                errors_by_category: BTreeMap::new(),
                intent_counts: BTreeMap::new(),
                cart_value: 0.0,
            };
        };

        let total_commands = session.commands.len();
        let successful_commands = session.commands.iter().filter(|c| c.success).count();
        let (success_rate, average_confidence) = if total_commands == 0 {
            (0.0, 0.0)
        } else {
            let confidence_sum: f64 = session.commands.iter().map(|c| c.confidence as f64).sum();
            (
                successful_commands as f64 / total_commands as f64,
                confidence_sum / total_commands as f64,
            )
        };

        let timers = session
            .timers
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(name, samples)| {
                let sum: u64 = samples.iter().sum();
                (
                    name.clone(),
                    TimerStats {
                        count: samples.len(),
                        average_ms: sum as f64 / samples.len() as f64,
                        max_ms: samples.iter().copied().max().unwrap_or(0),
                    },
                )
            })
            .collect();

        let mut errors_by_category = BTreeMap::new();
        for error in &session.errors {
            *errors_by_category.entry(error.category.clone()).or_insert(0) += 1;
        }

        let mut intent_counts = BTreeMap::new();
        for command in &session.commands {
            *intent_counts.entry(command.intent.to_string()).or_insert(0) += 1;
        }

        Self {
            session_id: Some(session.session_id.clone()),
            total_commands,
            successful_commands,
            success_rate,
            average_confidence,
            timers,
            errors_by_category,
            intent_counts,
            cart_value: session.cart_value,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    session: Option<SessionMetrics>,
    running: HashMap<String, Instant>,
}

pub struct PerformanceTracker {
    store: Arc<dyn MetricsStore>,
    state: Mutex<TrackerState>,
}

impl PerformanceTracker {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self {
            store,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Tracker that never touches disk
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMetricsStore::new()))
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // A panic elsewhere must not take metrics down with it
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, session: &SessionMetrics) {
        if let Err(e) = self.store.save(session) {
            log::warn!("📊 Failed to persist metrics for {}: {}", session.session_id, e);
        }
    }

    /// Run `update` against the open session, opening one if needed, then persist
    fn with_session(&self, update: impl FnOnce(&mut SessionMetrics)) {
        let mut state = self.lock();
        let session = state.session.get_or_insert_with(|| {
            let id = uuid::Uuid::new_v4().to_string();
            log::debug!("📊 Implicitly starting metrics session {}", id);
            SessionMetrics::new(id)
        });
        update(session);
        let snapshot = session.clone();
        drop(state);
        self.persist(&snapshot);
    }

    /// Start a fresh session, closing any open one
    pub fn start_session(&self) -> String {
        self.end_session();

        let session = SessionMetrics::new(uuid::Uuid::new_v4().to_string());
        let id = session.session_id.clone();
        log::info!("📊 Started metrics session {}", id);

        let snapshot = session.clone();
        {
            let mut state = self.lock();
            state.session = Some(session);
            state.running.clear();
        }
        self.persist(&snapshot);
        id
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock()
            .session
            .as_ref()
            .map(|session| session.session_id.clone())
    }

    /// Restarting a running timer resets its start point
    pub fn start_timer(&self, name: &str) {
        self.lock().running.insert(name.to_string(), Instant::now());
    }

    /// Stop a timer and record its duration; `None` if it was not running
    pub fn end_timer(&self, name: &str) -> Option<Duration> {
        let started = self.lock().running.remove(name)?;
        let elapsed = started.elapsed();
        log::debug!("⏱️ {} took {:?}", name, elapsed);
        self.with_session(|session| {
            session
                .timers
                .entry(name.to_string())
                .or_default()
                .push(elapsed.as_millis() as u64);
        });
        Some(elapsed)
    }

    /// Drop a running timer without recording it
    pub fn cancel_timer(&self, name: &str) -> bool {
        self.lock().running.remove(name).is_some()
    }

    pub fn is_timer_running(&self, name: &str) -> bool {
        self.lock().running.contains_key(name)
    }

    pub fn track_command(
        &self,
        transcript: &str,
        intent: Intent,
        entities: &Entities,
        success: bool,
        confidence: f32,
    ) {
        log::info!(
            "📊 Command '{}' → {} (success: {}, confidence: {:.2})",
            transcript,
            intent,
            success,
            confidence
        );
        let record = CommandRecord {
            timestamp: Utc::now(),
            transcript: transcript.to_string(),
            intent,
            entities: entities.clone(),
            success,
            confidence: confidence.clamp(0.0, 1.0),
        };
        self.with_session(|session| session.commands.push(record));
    }

    pub fn track_error(&self, category: &str, message: &str, context: Value) {
        log::warn!("📊 [{}] {}", category, message);
        let record = ErrorRecord {
            timestamp: Utc::now(),
            category: category.to_string(),
            message: message.to_string(),
            context,
        };
        self.with_session(|session| session.errors.push(record));
    }

    pub fn update_cart_value(&self, value: f64) {
        self.with_session(|session| session.cart_value = value);
    }

    pub fn get_aggregate_metrics(&self) -> AggregateMetrics {
        AggregateMetrics::from_session(self.lock().session.as_ref())
    }

    /// Human-readable summary of the current session
    pub fn get_performance_report(&self) -> String {
        let metrics = self.get_aggregate_metrics();
        let mut report = String::new();

        let _ = writeln!(
            report,
            "Voice commerce session {}",
            metrics.session_id.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(
            report,
            "Commands: {} ({} successful, {:.0}% success rate)",
            metrics.total_commands,
            metrics.successful_commands,
            metrics.success_rate * 100.0
        );
        let _ = writeln!(
            report,
            "Average confidence: {:.2}",
            metrics.average_confidence
        );
        for (name, stats) in &metrics.timers {
            let _ = writeln!(
                report,
                "Timer {}: {} samples, avg {:.0}ms, max {}ms",
                name, stats.count, stats.average_ms, stats.max_ms
            );
        }
        for (intent, count) in &metrics.intent_counts {
            let _ = writeln!(report, "Intent {}: {}", intent, count);
        }
        for (category, count) in &metrics.errors_by_category {
            let _ = writeln!(report, "Errors [{}]: {}", category, count);
        }
        let _ = writeln!(report, "Cart value: {:.2}", metrics.cart_value);

        report
    }

    /// Every session the store knows about, oldest first
    pub fn load_metrics(&self) -> Vec<SessionMetrics> {
        match self.store.load_all() {
            Ok(sessions) => sessions,
            Err(e) => {
                log::warn!("📊 Failed to load stored metrics: {}", e);
                Vec::new()
            }
        }
    }

    /// Close the open session, if any, and persist it
    pub fn end_session(&self) {
        let finished = {
            let mut state = self.lock();
            state.running.clear();
            state.session.take()
        };
        if let Some(mut session) = finished {
            session.ended_at = Some(Utc::now());
            log::info!(
                "📊 Ended metrics session {} ({} commands)",
                session.session_id,
                session.commands.len()
            );
            self.persist(&session);
        }
    }
}

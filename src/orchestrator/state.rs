use crate::commerce::Product;
use crate::intent::{Entities, Intent, ResolutionSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use strum::Display;

/// Turns kept for inspection
pub const HISTORY_LIMIT: usize = 50;

/// Where the dialogue is, as seen by front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Idle,
    /// A transcript is waiting out the quiet period
    Debouncing,
    Resolving,
    Validating,
    /// A risky action is waiting for yes or no
    AwaitingConfirmation,
    Executing,
}

/// Side effect deferred until the shopper says yes
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Checkout { total: f64 },
    AddToCart { product: Product, quantity: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub intent: Intent,
    pub entities: Entities,
    pub action: PendingAction,
    /// Already spoken
    pub prompt: String,
    pub reprompted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub turn_id: u64,
    pub timestamp: DateTime<Utc>,
    pub transcript: String,
    pub intent: Intent,
    pub source: Option<ResolutionSource>,
    pub response: String,
}

/// Mutable dialogue state, owned by one orchestrator
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub current_product: Option<Product>,
    pub search_results: Vec<Product>,
    pub pending: Option<PendingConfirmation>,
    pub history: VecDeque<TurnRecord>,
}

impl SessionState {
    pub fn record(&mut self, record: TurnRecord) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Replace the cursor with fresh results; the top hit becomes current
    pub fn set_results(&mut self, results: Vec<Product>) {
        self.current_product = results.first().cloned();
        self.search_results = results;
    }
}

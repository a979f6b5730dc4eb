//! The voice commerce dialogue loop.
//!
//! A transcript goes through a speaking guard and a debounce, is resolved to
//! an intent, validated, and then either executed or parked behind a spoken
//! confirmation. Every turn ends in exactly one spoken reply.
//!
//! Turns are numbered as they are accepted. A turn that has been overtaken by
//! a newer transcript while its resolution or search was in flight is dropped
//! before it touches the cart, the cursor or the speaker.

pub mod responses;
pub mod state;

pub use state::{DialogueState, PendingAction, PendingConfirmation, TurnRecord, HISTORY_LIMIT};

use crate::audio_queue::{AudioQueue, PlaybackOutcome, Priority, SpeakCallbacks};
use crate::commerce::{Cart, CartItem, CatalogError, Navigator, Product, ProductCatalog};
use crate::config::{AmbiguousConfirmationPolicy, CommerceConfig};
use crate::error::{CommerceError, Result};
use crate::intent::{
    EnhancementContext, Entities, Intent, IntentResolution, IntentResolver, PatternCommand,
    ResolutionSource,
};
use crate::performance::{
    PerformanceTracker, TIMER_AI, TIMER_RECOGNITION, TIMER_SEARCH, TIMER_TOTAL,
};
use crate::recognition::RecognitionEvent;
use crate::tts::Voice;
use crate::validator::{CommandValidator, ValidationRequest};
use chrono::Utc;
use responses::{ResponseTemplates, CANCELLED, DIDNT_CATCH, EMPTY_CART};
use serde_json::json;
use state::SessionState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// The marketplace side of the conversation
pub struct Collaborators {
    pub catalog: Arc<dyn ProductCatalog>,
    pub cart: Arc<dyn Cart>,
    pub navigator: Arc<dyn Navigator>,
}

struct Reply {
    text: String,
    priority: Priority,
}

impl Reply {
    fn normal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Normal,
        }
    }

    fn high(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::High,
        }
    }
}

struct Executed {
    reply: Reply,
    success: bool,
}

impl Executed {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::normal(text),
            success: true,
        }
    }

    fn failed(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::normal(text),
            success: false,
        }
    }
}

enum Focus {
    Ready,
    Stale,
    Ended(Executed),
}

/// Loose match between a spoken product name and a catalog entry
fn names_product(requested: &str, product: &Product) -> bool {
    let requested = requested.to_lowercase();
    let requested = requested.strip_suffix('s').unwrap_or(&requested);
    let name = product.name.to_lowercase();
    let name = name.strip_suffix('s').unwrap_or(&name);
    name.contains(requested) || requested.contains(name)
}

struct TurnOutput {
    reply: Reply,
    intent: Intent,
    source: Option<ResolutionSource>,
}

struct Inner {
    config: CommerceConfig,
    resolver: IntentResolver,
    validator: CommandValidator,
    responses: ResponseTemplates,
    catalog: Arc<dyn ProductCatalog>,
    cart: Arc<dyn Cart>,
    navigator: Arc<dyn Navigator>,
    audio: Arc<AudioQueue>,
    tracker: Arc<PerformanceTracker>,
    session: tokio::sync::Mutex<SessionState>,
    latest_turn: AtomicU64,
    debounce: Mutex<Option<CancellationToken>>,
    state_tx: watch::Sender<DialogueState>,
    voice: Mutex<Voice>,
}

/// Cheap to clone; all clones drive the same conversation
#[derive(Clone)]
pub struct VoiceCommerce {
    inner: Arc<Inner>,
}

impl VoiceCommerce {
    pub fn new(
        config: CommerceConfig,
        resolver: IntentResolver,
        collaborators: Collaborators,
        audio: Arc<AudioQueue>,
        tracker: Arc<PerformanceTracker>,
    ) -> Self {
        if tracker.session_id().is_none() {
            tracker.start_session();
        }
        let (state_tx, _) = watch::channel(DialogueState::Idle);

        Self {
            inner: Arc::new(Inner {
                validator: CommandValidator::from_config(&config),
                responses: ResponseTemplates::from_config(&config),
                config,
                resolver,
                catalog: collaborators.catalog,
                cart: collaborators.cart,
                navigator: collaborators.navigator,
                audio,
                tracker,
                session: tokio::sync::Mutex::new(SessionState::default()),
                latest_turn: AtomicU64::new(0),
                debounce: Mutex::new(None),
                state_tx,
                voice: Mutex::new(Voice::default()),
            }),
        }
    }

    /// Accept a final transcript.
    ///
    /// Returns the turn id, or `None` when the transcript was dropped because
    /// it was empty or the assistant is speaking. An accepted transcript
    /// replaces any transcript still waiting out the debounce window.
    pub fn submit_transcript(&self, transcript: impl Into<String>) -> Option<u64> {
        let transcript = transcript.into().trim().to_string();
        if transcript.is_empty() {
            log::debug!("Ignoring empty transcript");
            return None;
        }
        if self.inner.audio.is_speaking() {
            log::info!("🔇 Dropping '{}' while speaking", transcript);
            return None;
        }

        let turn_id = self.inner.latest_turn.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some(previous) = self.lock_debounce().replace(token.clone()) {
            previous.cancel();
        }
        self.set_state(DialogueState::Debouncing);
        log::debug!("⏳ Turn {} waiting: '{}'", turn_id, transcript);

        let this = self.clone();
        let debounce = self.inner.config.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    log::debug!("Turn {} superseded during debounce", turn_id);
                }
                _ = tokio::time::sleep(debounce) => {
                    this.process_turn(turn_id, transcript).await;
                }
            }
        });

        Some(turn_id)
    }

    /// Feed one event from the recognizer
    pub async fn handle_recognition_event(&self, event: RecognitionEvent) -> Option<u64> {
        let tracker = &self.inner.tracker;
        match event {
            RecognitionEvent::Interim(text) => {
                if !tracker.is_timer_running(TIMER_RECOGNITION) {
                    tracker.start_timer(TIMER_RECOGNITION);
                }
                log::debug!("👂 Interim: '{}'", text);
                None
            }
            RecognitionEvent::Final(text) => {
                tracker.end_timer(TIMER_RECOGNITION);
                self.submit_transcript(text)
            }
            RecognitionEvent::Error(error) => {
                tracker.cancel_timer(TIMER_RECOGNITION);
                tracker.track_error("recognition", &error.to_string(), json!({}));
                if error.should_speak() {
                    self.speak(Reply::high(error.user_message())).await;
                }
                None
            }
        }
    }

    pub fn state(&self) -> DialogueState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DialogueState> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.audio.is_speaking()
    }

    pub fn stop_speaking(&self) {
        self.inner.audio.stop_all();
    }

    /// Id of the most recently accepted transcript
    pub fn current_turn(&self) -> u64 {
        self.inner.latest_turn.load(Ordering::SeqCst)
    }

    pub fn set_voice(&self, voice: Voice) {
        *self
            .inner
            .voice
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = voice;
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.inner.tracker
    }

    pub async fn current_product(&self) -> Option<Product> {
        self.inner.session.lock().await.current_product.clone()
    }

    pub async fn search_results(&self) -> Vec<Product> {
        self.inner.session.lock().await.search_results.clone()
    }

    pub async fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.inner.session.lock().await.pending.clone()
    }

    pub async fn history(&self) -> Vec<TurnRecord> {
        self.inner.session.lock().await.history.iter().cloned().collect()
    }

    fn lock_debounce(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner
            .debounce
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn voice(&self) -> Voice {
        *self
            .inner
            .voice
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: DialogueState) {
        let previous = self.inner.state_tx.send_replace(state);
        if previous != state {
            log::debug!("🔁 {} → {}", previous, state);
        }
    }

    fn is_stale(&self, turn_id: u64) -> bool {
        self.current_turn() != turn_id
    }

    fn track(
        &self,
        transcript: &str,
        intent: Intent,
        entities: &Entities,
        success: bool,
        confidence: f32,
    ) {
        self.inner
            .tracker
            .track_command(transcript, intent, entities, success, confidence);
    }

    async fn speak(&self, reply: Reply) -> PlaybackOutcome {
        let tracker = self.inner.tracker.clone();
        let text = reply.text.clone();
        let callbacks = SpeakCallbacks::on_end(move |outcome| {
            if outcome == PlaybackOutcome::Failed {
                tracker.track_error("audio", "Speech playback failed", json!({ "text": text }));
            }
        });

        match self
            .inner
            .audio
            .speak(reply.text, self.voice(), reply.priority, callbacks)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("🔇 Could not speak: {}", e);
                PlaybackOutcome::Failed
            }
        }
    }

    async fn process_turn(&self, turn_id: u64, transcript: String) {
        let mut session = self.inner.session.lock().await;
        if self.is_stale(turn_id) {
            log::debug!("Turn {} superseded before it started", turn_id);
            return;
        }

        log::info!("🎙️ Turn {}: '{}'", turn_id, transcript);
        let tracker = &self.inner.tracker;
        tracker.start_timer(TIMER_TOTAL);

        let output = match self.run_turn(&mut session, turn_id, &transcript).await {
            Ok(Some(output)) => output,
            Ok(None) => {
                log::info!("🗑️ Discarding superseded turn {}", turn_id);
                tracker.cancel_timer(TIMER_TOTAL);
                return;
            }
            Err(e) if self.is_stale(turn_id) => {
                log::debug!("Superseded turn {} failed: {}", turn_id, e);
                tracker.cancel_timer(TIMER_TOTAL);
                return;
            }
            Err(e) => {
                log::error!("❌ Turn {} failed: {}", turn_id, e);
                tracker.track_error(
                    "dispatch",
                    &e.to_string(),
                    json!({ "transcript": transcript, "turnId": turn_id }),
                );
                self.track(&transcript, Intent::Unknown, &Entities::default(), false, 0.0);
                TurnOutput {
                    reply: Reply::normal(DIDNT_CATCH),
                    intent: Intent::Unknown,
                    source: None,
                }
            }
        };

        session.record(TurnRecord {
            turn_id,
            timestamp: Utc::now(),
            transcript: transcript.clone(),
            intent: output.intent,
            source: output.source,
            response: output.reply.text.clone(),
        });
        let awaiting = session.pending.is_some();

        // Still holding the session so the next turn cannot start mid-sentence
        self.speak(output.reply).await;
        drop(session);

        tracker.end_timer(TIMER_TOTAL);
        if !self.is_stale(turn_id) {
            self.set_state(if awaiting {
                DialogueState::AwaitingConfirmation
            } else {
                DialogueState::Idle
            });
        }
    }

    async fn run_turn(
        &self,
        session: &mut SessionState,
        turn_id: u64,
        transcript: &str,
    ) -> Result<Option<TurnOutput>> {
        if let Some(pending) = session.pending.take() {
            if let Some(output) = self.answer_confirmation(session, pending, transcript).await? {
                return Ok(Some(output));
            }
        }

        let tracker = &self.inner.tracker;
        self.set_state(DialogueState::Resolving);
        let cart_items = self.inner.cart.items().await;
        let context = EnhancementContext::new(session.current_product.as_ref(), &cart_items);

        tracker.start_timer(TIMER_AI);
        let resolved = self.inner.resolver.resolve(transcript, &context).await;
        tracker.end_timer(TIMER_AI);

        if let Some(error) = &resolved.enhancement_error {
            tracker.track_error(
                "enhancement",
                &error.to_string(),
                json!({ "transcript": transcript }),
            );
        }
        if self.is_stale(turn_id) {
            return Ok(None);
        }

        let resolution = resolved.resolution;
        let source = resolved.source;
        let intent = resolution.intent;

        if intent == Intent::AddToCart {
            if let Some(name) = resolution.entities.product.as_deref() {
                match self.focus_named_product(session, turn_id, name).await {
                    Focus::Ready => {}
                    Focus::Stale => return Ok(None),
                    Focus::Ended(executed) => {
                        self.track(
                            transcript,
                            intent,
                            &resolution.entities,
                            executed.success,
                            resolution.confidence,
                        );
                        return Ok(Some(TurnOutput {
                            reply: executed.reply,
                            intent,
                            source: Some(source),
                        }));
                    }
                }
            }
        }

        self.set_state(DialogueState::Validating);
        let cart_total = self.inner.cart.total().await;
        let request = ValidationRequest {
            intent,
            entities: &resolution.entities,
            cart_total,
            cart_items: cart_items.len(),
            current_product: session.current_product.as_ref(),
        };
        let validation = self.inner.validator.validate_command(&request);

        if !validation.is_valid {
            log::info!("⛔ {} rejected: {:?}", intent, validation.message);
            self.track(
                transcript,
                intent,
                &resolution.entities,
                false,
                resolution.confidence,
            );
            let message = validation
                .message
                .unwrap_or_else(|| DIDNT_CATCH.to_string());
            return Ok(Some(TurnOutput {
                reply: Reply::normal(message),
                intent,
                source: Some(source),
            }));
        }

        if validation.needs_confirmation {
            let prompt = self.inner.validator.generate_confirmation_prompt(
                intent,
                &resolution.entities,
                &request,
            );
            let action = match (intent, &session.current_product) {
                (Intent::Checkout, _) => PendingAction::Checkout { total: cart_total },
                (Intent::AddToCart, Some(product)) => PendingAction::AddToCart {
                    product: product.clone(),
                    quantity: resolution.entities.quantity_or_default(),
                },
                (other, _) => {
                    return Err(CommerceError::InvalidInput(format!(
                        "{} cannot be confirmed",
                        other
                    )))
                }
            };

            log::info!("❓ Awaiting confirmation for {}", intent);
            self.track(
                transcript,
                intent,
                &resolution.entities,
                true,
                resolution.confidence,
            );
            session.pending = Some(PendingConfirmation {
                intent,
                entities: resolution.entities.clone(),
                action,
                prompt: prompt.clone(),
                reprompted: false,
            });
            return Ok(Some(TurnOutput {
                reply: Reply::normal(prompt),
                intent,
                source: Some(source),
            }));
        }

        self.set_state(DialogueState::Executing);
        let Some(executed) = self.execute(session, turn_id, &resolution, source).await? else {
            return Ok(None);
        };
        self.track(
            transcript,
            intent,
            &resolution.entities,
            executed.success,
            resolution.confidence,
        );

        Ok(Some(TurnOutput {
            reply: executed.reply,
            intent,
            source: Some(source),
        }))
    }

    /// `None` means the answer was not a yes or no and should run as a new command
    async fn answer_confirmation(
        &self,
        session: &mut SessionState,
        pending: PendingConfirmation,
        transcript: &str,
    ) -> Result<Option<TurnOutput>> {
        let validator = &self.inner.validator;
        let intent = pending.intent;

        if validator.is_negative_response(transcript) {
            log::info!("🚫 Cancelled pending {}", intent);
            self.track(transcript, intent, &pending.entities, false, 1.0);
            return Ok(Some(TurnOutput {
                reply: Reply::normal(CANCELLED),
                intent,
                source: None,
            }));
        }

        if validator.is_affirmative_response(transcript) {
            log::info!("✅ Confirmed pending {}", intent);
            self.set_state(DialogueState::Executing);
            let text = self.execute_pending(pending.action).await?;
            self.track(transcript, intent, &pending.entities, true, 1.0);
            return Ok(Some(TurnOutput {
                reply: Reply::normal(text),
                intent,
                source: None,
            }));
        }

        match self.inner.config.ambiguous_confirmation {
            AmbiguousConfirmationPolicy::TreatAsNo => {
                log::info!("🚫 Unclear answer, cancelling pending {}", intent);
                self.track(transcript, intent, &pending.entities, false, 0.0);
                Ok(Some(TurnOutput {
                    reply: Reply::normal(CANCELLED),
                    intent,
                    source: None,
                }))
            }
            AmbiguousConfirmationPolicy::RepromptOnce if !pending.reprompted => {
                log::info!("🔁 Unclear answer, asking again about {}", intent);
                let text = self.inner.responses.reprompt(&pending.prompt);
                session.pending = Some(PendingConfirmation {
                    reprompted: true,
                    ..pending
                });
                Ok(Some(TurnOutput {
                    reply: Reply::normal(text),
                    intent,
                    source: None,
                }))
            }
            AmbiguousConfirmationPolicy::RepromptOnce
            | AmbiguousConfirmationPolicy::TreatAsNewCommand => {
                log::info!(
                    "🤷 Dropping pending {}, treating '{}' as a new command",
                    intent,
                    transcript
                );
                Ok(None)
            }
        }
    }

    async fn execute_pending(&self, action: PendingAction) -> Result<String> {
        match action {
            PendingAction::Checkout { total: quoted } => {
                let total = self.inner.cart.total().await;
                if total <= 0.0 {
                    return Ok(EMPTY_CART.to_string());
                }
                if total != quoted {
                    log::debug!("Cart total moved from {} to {} since the prompt", quoted, total);
                }
                self.inner.navigator.push("/checkout").await?;
                self.inner.tracker.update_cart_value(total);
                Ok(self.inner.responses.checkout_confirmed(total))
            }
            PendingAction::AddToCart { product, quantity } => {
                self.add_to_cart(&product, quantity).await
            }
        }
    }

    async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<String> {
        let total = self.inner.cart.total().await + product.price * quantity as f64;
        self.inner
            .cart
            .add_to_cart(CartItem {
                product: product.clone(),
                quantity,
            })
            .await?;
        self.inner.tracker.update_cart_value(total);
        log::info!("🛒 Added {} x{}", product.name, quantity);
        Ok(self.inner.responses.added(product, quantity, total))
    }

    async fn timed_search(&self, query: &str) -> std::result::Result<Vec<Product>, CatalogError> {
        let tracker = &self.inner.tracker;
        tracker.start_timer(TIMER_SEARCH);
        let result = self.inner.catalog.search(query).await;
        tracker.end_timer(TIMER_SEARCH);
        if let Err(e) = &result {
            tracker.track_error("search", &e.to_string(), json!({ "query": query }));
        }
        result
    }

    /// Point the session at the product an add-to-cart command names,
    /// searching for it unless it is already in focus
    async fn focus_named_product(
        &self,
        session: &mut SessionState,
        turn_id: u64,
        name: &str,
    ) -> Focus {
        let name = name.trim();
        if name.is_empty()
            || session
                .current_product
                .as_ref()
                .is_some_and(|product| names_product(name, product))
        {
            return Focus::Ready;
        }

        let results = self.timed_search(name).await;
        if self.is_stale(turn_id) {
            return Focus::Stale;
        }
        let responses = &self.inner.responses;
        match results {
            Err(_) => Focus::Ended(Executed::failed(responses.search_failed())),
            Ok(results) if results.is_empty() => {
                log::info!("🔍 Nothing to add for {}", name);
                Focus::Ended(Executed::failed(responses.not_found(name)))
            }
            Ok(results) => {
                log::debug!("Focus moved to {} for add to cart", results[0].name);
                session.set_results(results);
                Focus::Ready
            }
        }
    }

    /// `Ok(None)` when the turn went stale along the way
    async fn execute(
        &self,
        session: &mut SessionState,
        turn_id: u64,
        resolution: &IntentResolution,
        source: ResolutionSource,
    ) -> Result<Option<Executed>> {
        let responses = &self.inner.responses;
        let suggested = resolution
            .suggested_response
            .clone()
            .filter(|text| !text.trim().is_empty());

        let executed = match resolution.intent {
            Intent::SearchProduct => return self.search(session, turn_id, resolution).await,
            Intent::BrowseVendor => return self.browse_vendor(session, turn_id, resolution).await,
            Intent::AddToCart => {
                let product = session.current_product.clone().ok_or_else(|| {
                    CommerceError::InvalidInput("add to cart without a product".to_string())
                })?;
                let quantity = resolution.entities.quantity_or_default();
                Executed::ok(self.add_to_cart(&product, quantity).await?)
            }
            Intent::ShowCart => {
                let items = self.inner.cart.items().await;
                let total = self.inner.cart.total().await;
                Executed::ok(responses.cart_summary(&items, total))
            }
            Intent::Checkout => {
                let total = self.inner.cart.total().await;
                if total <= 0.0 {
                    Executed::failed(EMPTY_CART)
                } else {
                    self.inner.navigator.push("/checkout").await?;
                    self.inner.tracker.update_cart_value(total);
                    Executed::ok(responses.checkout(total))
                }
            }
            Intent::ShowDeals => Executed::ok(suggested.unwrap_or_else(|| responses.deals())),
            Intent::Greeting => Executed::ok(suggested.unwrap_or_else(|| responses.greeting())),
            Intent::AskAbout => match source {
                ResolutionSource::Pattern(PatternCommand::BestSellers) => {
                    return self.best_sellers(session, turn_id).await
                }
                ResolutionSource::Pattern(PatternCommand::Reorder) => {
                    Executed::ok(responses.reorder())
                }
                _ => Executed::ok(suggested.unwrap_or_else(|| responses.help())),
            },
            Intent::Unknown => Executed::failed(DIDNT_CATCH),
        };

        Ok(Some(executed))
    }

    async fn search(
        &self,
        session: &mut SessionState,
        turn_id: u64,
        resolution: &IntentResolution,
    ) -> Result<Option<Executed>> {
        let responses = &self.inner.responses;
        let query = resolution
            .entities
            .product
            .clone()
            .or_else(|| resolution.enhanced_query.clone())
            .map(|query| query.trim().to_string())
            .filter(|query| !query.is_empty());
        let range = resolution.entities.price_range.filter(|range| !range.is_empty());

        if query.is_none() && range.is_none() {
            return Ok(Some(Executed::failed(responses.ask_for_query())));
        }

        let mut label = query.clone().unwrap_or_else(|| "products".to_string());
        if let Some(range) = &range {
            label = format!("{} {}", label, responses.price_range(range));
        }

        let results = self.timed_search(query.as_deref().unwrap_or_default()).await;
        if self.is_stale(turn_id) {
            return Ok(None);
        }
        let Ok(results) = results else {
            return Ok(Some(Executed::failed(responses.search_failed())));
        };

        let results: Vec<Product> = match range {
            Some(range) => results
                .into_iter()
                .filter(|product| range.contains(product.price))
                .collect(),
            None => results,
        };

        if results.is_empty() {
            log::info!("🔍 Nothing found for {}", label);
            return Ok(Some(Executed::failed(responses.not_found(&label))));
        }

        log::info!("🔍 {} results for {}", results.len(), label);
        let text = responses.search_results(&label, &results);
        session.set_results(results);
        Ok(Some(Executed::ok(text)))
    }

    async fn browse_vendor(
        &self,
        session: &mut SessionState,
        turn_id: u64,
        resolution: &IntentResolution,
    ) -> Result<Option<Executed>> {
        let responses = &self.inner.responses;
        let Some(vendor) = resolution
            .entities
            .vendor
            .as_deref()
            .map(str::trim)
            .filter(|vendor| !vendor.is_empty())
        else {
            return Ok(Some(Executed::ok(responses.vendor_roster())));
        };

        let results = self.timed_search(vendor).await;
        if self.is_stale(turn_id) {
            return Ok(None);
        }
        let Ok(results) = results else {
            return Ok(Some(Executed::failed(responses.search_failed())));
        };

        let needle = vendor.to_lowercase();
        let (from_vendor, others): (Vec<Product>, Vec<Product>) = results
            .into_iter()
            .partition(|product| product.vendor.to_lowercase().contains(&needle));
        let display = from_vendor
            .first()
            .map(|product| product.vendor.clone())
            .unwrap_or_else(|| vendor.to_string());
        let results = if from_vendor.is_empty() { others } else { from_vendor };

        if results.is_empty() {
            return Ok(Some(Executed::failed(responses.vendor_results(&display, &[]))));
        }

        let text = responses.vendor_results(&display, &results);
        session.set_results(results);
        Ok(Some(Executed::ok(text)))
    }

    async fn best_sellers(
        &self,
        session: &mut SessionState,
        turn_id: u64,
    ) -> Result<Option<Executed>> {
        let results = self.timed_search("").await;
        if self.is_stale(turn_id) {
            return Ok(None);
        }
        let responses = &self.inner.responses;
        match results {
            Ok(results) if !results.is_empty() => {
                let text = responses.best_sellers(&results);
                session.set_results(results);
                Ok(Some(Executed::ok(text)))
            }
            _ => Ok(Some(Executed::ok(responses.help()))),
        }
    }
}

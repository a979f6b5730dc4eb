//! Fakes for the marketplace collaborators and a harness that wires them
//! into a `VoiceCommerce` running on a paused tokio clock.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use voice_commerce::{
    audio_queue::AudioQueue,
    audio_sink::{AudioError, AudioSink},
    commerce::{Cart, CartItem, CatalogError, Navigator, Product, ProductCatalog},
    config::CommerceConfig,
    error::CommerceError,
    intent::{
        patterns, CommandEnhancer, EnhancementContext, EnhancementError, IntentResolution,
        IntentResolver,
    },
    performance::PerformanceTracker,
    tts::{AudioClip, SpeechSynthesizer, TTSError, Voice},
    Collaborators, VoiceCommerce,
};

/// Long enough on the paused clock for debounce, resolution and speech to finish
pub const SETTLE: Duration = Duration::from_secs(10);

pub fn product(name: &str, price: f64, vendor: &str) -> Product {
    Product {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        price,
        vendor: vendor.to_string(),
        vendor_id: None,
        image: None,
        description: None,
    }
}

pub fn market() -> Vec<Product> {
    vec![
        product("Hummus", 22.0, "Galilee Farms"),
        product("Sourdough Bread", 18.0, "Jaffa Bakery"),
        product("Vanilla Ice Cream", 30.0, "Negev Dairy"),
        product("Goat Cheese", 35.0, "Negev Dairy"),
        product("Aged Cheese", 60.0, "Negev Dairy"),
    ]
}

pub struct FakeCatalog {
    products: Vec<Product>,
    delay: Duration,
    fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            delay: Duration::ZERO,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductCatalog for FakeCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(CatalogError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        let needle = query.to_lowercase();
        Ok(self
            .products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle) || p.vendor.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingCart {
    items: Mutex<Vec<CartItem>>,
    pub adds: Mutex<Vec<CartItem>>,
    fail_adds: bool,
}

impl RecordingCart {
    /// A cart holding a single line worth `total`
    pub fn with_total(total: f64) -> Self {
        Self {
            items: Mutex::new(vec![CartItem {
                product: product("Weekly Box", total, "Galilee Farms"),
                quantity: 1,
            }]),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_adds: true,
            ..Default::default()
        }
    }

    pub fn adds(&self) -> Vec<CartItem> {
        self.adds.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cart for RecordingCart {
    async fn items(&self) -> Vec<CartItem> {
        self.items.lock().unwrap().clone()
    }

    async fn total(&self) -> f64 {
        self.items.lock().unwrap().iter().map(CartItem::line_total).sum()
    }

    async fn add_to_cart(&self, item: CartItem) -> Result<(), CommerceError> {
        self.adds.lock().unwrap().push(item.clone());
        if self.fail_adds {
            return Err(CommerceError::Cart("cart service unavailable".to_string()));
        }
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn push(&self, path: &str) -> Result<(), CommerceError> {
        self.paths.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

/// Text-only synthesizer that fails for any text containing a marker
#[derive(Default)]
pub struct FakeSynthesizer {
    pub fail_marker: Option<String>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioClip, TTSError> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(TTSError::ApiError {
                    status: 500,
                    message: "synthesis failed".to_string(),
                });
            }
        }
        Ok(AudioClip {
            text: text.to_string(),
            voice,
            data: Vec::new(),
            format: "text".to_string(),
        })
    }
}

/// Records what was played and how many clips ever played at once
pub struct RecordingSink {
    duration: Duration,
    playing: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    pub stops: AtomicUsize,
    pub started: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            playing: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    pub fn last_spoken(&self) -> String {
        self.started().last().cloned().unwrap_or_default()
    }
}

struct PlayingGuard<'a>(&'a AtomicUsize);

impl Drop for PlayingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, clip: &AudioClip, cancel: CancellationToken) -> Result<(), AudioError> {
        let now_playing = self.playing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now_playing, Ordering::SeqCst);
        // The queue may drop this future mid-play when it preempts
        let _playing = PlayingGuard(&self.playing);
        self.started.lock().unwrap().push(clip.text.clone());

        let completed = tokio::select! {
            _ = tokio::time::sleep(self.duration) => true,
            _ = cancel.cancelled() => false,
        };

        if completed {
            self.finished.lock().unwrap().push(clip.text.clone());
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), AudioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub enum EnhancerBehavior {
    /// Always errors
    Failing,
    /// Answers like the pattern table but confidently, after a delay
    Echo { delay: Duration },
    /// Never answers within any sensible timeout
    Hanging,
}

pub struct FakeEnhancer {
    behavior: EnhancerBehavior,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEnhancer {
    pub fn new(behavior: EnhancerBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandEnhancer for FakeEnhancer {
    async fn enhance_command(
        &self,
        transcript: &str,
        _context: &EnhancementContext,
    ) -> Result<IntentResolution, EnhancementError> {
        self.calls.lock().unwrap().push(transcript.to_string());
        match self.behavior {
            EnhancerBehavior::Failing => Err(EnhancementError::ApiError {
                status: 500,
                message: "model overloaded".to_string(),
            }),
            EnhancerBehavior::Echo { delay } => {
                tokio::time::sleep(delay).await;
                let mut resolution = patterns::match_command(transcript)
                    .map(|matched| matched.into_resolution())
                    .unwrap_or_default();
                resolution.confidence = 0.95;
                Ok(resolution)
            }
            EnhancerBehavior::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(EnhancementError::LLM("gave up".to_string()))
            }
        }
    }
}

pub struct Harness {
    pub commerce: VoiceCommerce,
    pub catalog: Arc<FakeCatalog>,
    pub cart: Arc<RecordingCart>,
    pub navigator: Arc<RecordingNavigator>,
    pub sink: Arc<RecordingSink>,
    pub tracker: Arc<PerformanceTracker>,
}

pub struct HarnessBuilder {
    config: CommerceConfig,
    catalog: FakeCatalog,
    cart: RecordingCart,
    enhancer: Option<Arc<dyn CommandEnhancer>>,
    speech: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: CommerceConfig::default(),
            catalog: FakeCatalog::new(market()),
            cart: RecordingCart::default(),
            enhancer: None,
            speech: Duration::from_millis(100),
        }
    }

    pub fn config(mut self, config: CommerceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: FakeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn cart(mut self, cart: RecordingCart) -> Self {
        self.cart = cart;
        self
    }

    pub fn enhancer(mut self, enhancer: Arc<dyn CommandEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn speech(mut self, duration: Duration) -> Self {
        self.speech = duration;
        self
    }

    pub fn build(self) -> Harness {
        let catalog = Arc::new(self.catalog);
        let cart = Arc::new(self.cart);
        let navigator = Arc::new(RecordingNavigator::default());
        let sink = Arc::new(RecordingSink::new(self.speech));
        let tracker = Arc::new(PerformanceTracker::in_memory());

        let audio = Arc::new(AudioQueue::new(
            Arc::new(FakeSynthesizer::default()),
            sink.clone(),
        ));
        let resolver = IntentResolver::new(
            self.enhancer,
            self.config.confidence_threshold,
            self.config.enhancement_timeout,
        );
        let commerce = VoiceCommerce::new(
            self.config,
            resolver,
            Collaborators {
                catalog: catalog.clone(),
                cart: cart.clone(),
                navigator: navigator.clone(),
            },
            audio,
            tracker.clone(),
        );

        Harness {
            commerce,
            catalog,
            cart,
            navigator,
            sink,
            tracker,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    /// Submit a transcript and let the turn play out
    pub async fn say(&self, transcript: &str) -> Option<u64> {
        let turn = self.commerce.submit_transcript(transcript);
        tokio::time::sleep(SETTLE).await;
        turn
    }

    pub fn spoken(&self) -> Vec<String> {
        self.sink.started()
    }

    pub fn last_spoken(&self) -> String {
        self.sink.last_spoken()
    }
}

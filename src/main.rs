use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use voice_commerce::{
    audio_queue::AudioQueue,
    audio_sink::{AudioSink, ConsoleSink, FileSink},
    commerce::{HttpProductCatalog, InMemoryCart, LogNavigator},
    config::{load_config, ApiConfig, CommerceConfig},
    intent::{CommandEnhancer, HttpCommandEnhancer, IntentResolver},
    llm::{GroqCommandEnhancer, GroqLLM},
    performance::{JsonFileMetricsStore, MemoryMetricsStore, MetricsStore, PerformanceTracker},
    recognition::RecognitionEvent,
    tts::{ElevenLabsTTS, SpeechSynthesizer, TextOnlySynthesizer, Voice},
    Collaborators, VoiceCommerce,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EnhancerKind {
    /// Groq chat completion
    Groq,
    /// The marketplace's /api/ai/enhance-command route
    Http,
    /// Pattern table only
    Off,
}

/// The marketplace route needs no keys, so it works offline too
fn select_enhancer(
    kind: EnhancerKind,
    api_config: Option<&ApiConfig>,
    api_base_url: &str,
) -> anyhow::Result<Option<Arc<dyn CommandEnhancer>>> {
    let enhancer: Option<Arc<dyn CommandEnhancer>> = match (kind, api_config) {
        (EnhancerKind::Off, _) | (EnhancerKind::Groq, None) => None,
        (EnhancerKind::Http, _) => {
            Some(Arc::new(HttpCommandEnhancer::new(api_base_url)?) as Arc<dyn CommandEnhancer>)
        }
        (EnhancerKind::Groq, Some(keys)) => {
            let llm = GroqLLM::new(keys.groq_key().to_string())?;
            Some(Arc::new(GroqCommandEnhancer::new(llm)) as Arc<dyn CommandEnhancer>)
        }
    };
    Ok(enhancer)
}

#[derive(Parser)]
#[command(name = "voice-commerce")]
#[command(about = "Talk to the marketplace: type what you would say, one command per line")]
struct Args {
    /// Marketplace base URL (overrides VOICE_COMMERCE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Where commands get their AI interpretation
    #[arg(long, value_enum, default_value = "groq")]
    enhancer: EnhancerKind,

    /// No API keys: printed replies, and no Groq enhancer
    #[arg(long)]
    offline: bool,

    /// Write synthesized replies to this directory instead of printing them
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Use the male voice persona
    #[arg(long)]
    male_voice: bool,

    /// Hold printed replies for about as long as speaking them would take
    #[arg(long, default_value = "0")]
    words_per_minute: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("🚀 Starting voice-commerce");

    let mut config = CommerceConfig::from_env().context("Invalid VOICE_COMMERCE_* settings")?;
    if let Some(url) = args.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    log::info!("🛍️ Marketplace at {}", config.api_base_url);

    let api_config = if args.offline {
        None
    } else {
        Some(load_config().context("API keys are required unless --offline is given")?)
    };

    let enhancer = select_enhancer(args.enhancer, api_config.as_ref(), &config.api_base_url)?;
    match &enhancer {
        Some(_) => log::info!("🧠 Using {:?} enhancer", args.enhancer),
        None => log::info!("🧠 Pattern matching only"),
    }
    let resolver = IntentResolver::new(
        enhancer,
        config.confidence_threshold,
        config.enhancement_timeout,
    );

    let synthesizer: Arc<dyn SpeechSynthesizer> = match &api_config {
        Some(keys) if args.audio_dir.is_some() => {
            Arc::new(ElevenLabsTTS::new(keys.elevenlabs_key().to_string())?)
        }
        _ => Arc::new(TextOnlySynthesizer),
    };
    let sink: Arc<dyn AudioSink> = match &args.audio_dir {
        Some(dir) if api_config.is_some() => Arc::new(FileSink::new(dir.clone())?),
        _ => Arc::new(ConsoleSink::paced(args.words_per_minute)),
    };
    let audio = Arc::new(AudioQueue::new(synthesizer, sink));

    let store: Arc<dyn MetricsStore> = match &config.metrics_dir {
        Some(dir) => Arc::new(JsonFileMetricsStore::new(dir.clone())?),
        None => Arc::new(MemoryMetricsStore::new()),
    };
    let tracker = Arc::new(PerformanceTracker::new(store));

    let collaborators = Collaborators {
        catalog: Arc::new(HttpProductCatalog::new(config.api_base_url.clone())?),
        cart: Arc::new(InMemoryCart::new()),
        navigator: Arc::new(LogNavigator),
    };

    let commerce = VoiceCommerce::new(config, resolver, collaborators, audio, tracker.clone());
    if args.male_voice {
        commerce.set_voice(Voice::Male);
    }

    println!("🎧 Type a command and press enter, e.g. \"show me hummus\"");
    println!("   /report prints session metrics, Ctrl+C exits");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line == "/report" {
                    println!("{}", tracker.get_performance_report());
                    continue;
                }
                commerce
                    .handle_recognition_event(RecognitionEvent::Interim(line.to_string()))
                    .await;
                if commerce
                    .handle_recognition_event(RecognitionEvent::Final(line.to_string()))
                    .await
                    .is_none()
                    && !line.is_empty()
                {
                    println!("🔇 (still talking, try again in a moment)");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("🛑 Interrupted");
                break;
            }
        }
    }

    commerce.stop_speaking();
    tracker.end_session();
    println!("{}", tracker.get_performance_report());
    Ok(())
}

mod common;

use common::{
    market, EnhancerBehavior, FakeCatalog, FakeEnhancer, Harness, HarnessBuilder, RecordingCart,
    SETTLE,
};
use std::sync::Arc;
use std::time::Duration;
use voice_commerce::{
    config::{AmbiguousConfirmationPolicy, CommerceConfig},
    intent::{Intent, PatternCommand, ResolutionSource},
    orchestrator::{
        responses::{CANCELLED, DIDNT_CATCH},
        PendingAction,
    },
    performance::{TIMER_RECOGNITION, TIMER_SEARCH, TIMER_TOTAL},
    recognition::{RecognitionError, RecognitionEvent},
    DialogueState,
};

fn policy(policy: AmbiguousConfirmationPolicy) -> CommerceConfig {
    CommerceConfig {
        ambiguous_confirmation: policy,
        ..CommerceConfig::default()
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_search_with_no_results_apologizes() {
    let harness = HarnessBuilder::new()
        .catalog(FakeCatalog::new(Vec::new()))
        .build();

    harness.say("show me hummus").await;

    assert_eq!(
        harness.last_spoken(),
        "Sorry, I couldn't find any hummus. You could try searching for \"bread\", \"cheese\" or \"olive oil\" instead."
    );
    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    assert!(harness.commerce.current_product().await.is_none());
    assert!(harness.commerce.search_results().await.is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_checkout_with_empty_cart_does_not_navigate() {
    let harness = Harness::new();

    harness.say("checkout").await;

    assert!(harness.navigator.paths().is_empty());
    assert_eq!(
        harness.last_spoken(),
        "Your cart is empty. Add some items before checking out."
    );
    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.total_commands, 1);
    assert_eq!(metrics.successful_commands, 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_checkout_below_threshold_navigates() {
    let harness = HarnessBuilder::new()
        .cart(RecordingCart::with_total(145.0))
        .build();

    harness.say("checkout").await;

    assert_eq!(harness.navigator.paths(), vec!["/checkout"]);
    assert_eq!(
        harness.last_spoken(),
        "Your total is 145 shekels. Taking you to checkout now."
    );
    assert_eq!(harness.tracker.get_aggregate_metrics().cart_value, 145.0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_rapid_transcripts_only_last_is_resolved() {
    let harness = Harness::new();

    let first = harness.commerce.submit_transcript("show me bread");
    tokio::time::sleep(Duration::from_millis(120)).await;
    let second = harness.commerce.submit_transcript("show me ice cream");
    tokio::time::sleep(SETTLE).await;

    assert_eq!(first, Some(1));
    assert_eq!(second, Some(2));
    assert_eq!(harness.catalog.queries(), vec!["ice cream"]);
    assert_eq!(
        harness.spoken(),
        vec!["I found 1 result for ice cream. The top result is Vanilla Ice Cream from Negev Dairy for 30 shekels."]
    );
    assert_eq!(
        harness.commerce.current_product().await.map(|p| p.name),
        Some("Vanilla Ice Cream".to_string())
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_declined_confirmation_never_executes() {
    let harness = HarnessBuilder::new()
        .cart(RecordingCart::with_total(600.0))
        .build();

    harness.say("checkout").await;
    assert_eq!(
        harness.last_spoken(),
        "Your total is 600 shekels. Would you like to proceed to checkout?"
    );
    assert_eq!(harness.commerce.state(), DialogueState::AwaitingConfirmation);
    let pending = harness.commerce.pending_confirmation().await.unwrap();
    assert_eq!(pending.action, PendingAction::Checkout { total: 600.0 });

    harness.say("no").await;

    assert_eq!(harness.last_spoken(), CANCELLED);
    assert!(harness.navigator.paths().is_empty());
    assert!(harness.commerce.pending_confirmation().await.is_none());
    assert_eq!(harness.commerce.state(), DialogueState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_checkout_navigates() {
    let harness = HarnessBuilder::new()
        .cart(RecordingCart::with_total(600.0))
        .build();

    harness.say("checkout").await;
    harness.say("yes please").await;

    assert_eq!(harness.navigator.paths(), vec!["/checkout"]);
    assert_eq!(
        harness.last_spoken(),
        "Great. Your total is 600 shekels. Taking you to checkout now."
    );
    assert!(harness.commerce.pending_confirmation().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_collapses_burst_into_one_turn() {
    let harness = Harness::new();

    for transcript in ["show me bread", "show me cheese", "show me hummus"] {
        harness.commerce.submit_transcript(transcript);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(SETTLE).await;

    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    assert_eq!(harness.spoken().len(), 1);
    assert_eq!(harness.tracker.get_aggregate_metrics().total_commands, 1);
    assert_eq!(harness.commerce.history().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bulk_quantity_needs_confirmation() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("add six to my cart").await;

    assert!(harness.cart.adds().is_empty());
    assert_eq!(
        harness.last_spoken(),
        "Just to confirm, add 6 of Hummus for 132 shekels?"
    );

    harness.say("yes").await;

    let adds = harness.cart.adds();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].product.name, "Hummus");
    assert_eq!(adds[0].quantity, 6);
    assert_eq!(
        harness.last_spoken(),
        "I've added 6 Hummus to your cart. Your total is now 132 shekels."
    );
}

#[tokio::test(start_paused = true)]
async fn test_add_reports_new_total_once() {
    let harness = HarnessBuilder::new()
        .cart(RecordingCart::with_total(50.0))
        .build();

    harness.say("show me hummus").await;
    harness.say("add it to my cart").await;

    let adds = harness.cart.adds();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].quantity, 1);
    assert_eq!(
        harness.last_spoken(),
        "I've added Hummus to your cart. Your total is now 72 shekels."
    );
    assert_eq!(harness.tracker.get_aggregate_metrics().cart_value, 72.0);
}

#[tokio::test(start_paused = true)]
async fn test_add_without_product_is_rejected() {
    let harness = Harness::new();

    harness.say("add it to my cart").await;

    assert!(harness.cart.adds().is_empty());
    assert_eq!(
        harness.last_spoken(),
        "Please search for a product first, then ask me to add it to your cart."
    );
}

#[tokio::test(start_paused = true)]
async fn test_declined_add_leaves_cart_alone() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("add six to my cart").await;
    harness.say("no").await;

    assert!(harness.cart.adds().is_empty());
    assert_eq!(harness.last_spoken(), CANCELLED);

    // Nothing is pending any more, so a late "yes" adds nothing
    harness.say("yes").await;
    assert!(harness.cart.adds().is_empty());
    assert_eq!(harness.last_spoken(), DIDNT_CATCH);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_add_naming_another_product_moves_focus() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("add 2 sourdough bread to my cart").await;

    assert_eq!(harness.catalog.queries(), vec!["hummus", "sourdough bread"]);
    let adds = harness.cart.adds();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].product.name, "Sourdough Bread");
    assert_eq!(adds[0].quantity, 2);
    assert_eq!(
        harness.last_spoken(),
        "I've added 2 Sourdough Bread to your cart. Your total is now 36 shekels."
    );

    // The named product stays in focus for follow-ups
    harness.say("add it to my cart").await;
    assert_eq!(harness.cart.adds()[1].product.name, "Sourdough Bread");
}

#[tokio::test(start_paused = true)]
async fn test_add_naming_focused_product_skips_search() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("add 2 hummus").await;

    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    let adds = harness.cart.adds();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].product.name, "Hummus");
    assert_eq!(adds[0].quantity, 2);
}

#[tokio::test(start_paused = true)]
async fn test_add_naming_unknown_product_adds_nothing() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("add 2 falafel to my cart").await;

    assert!(harness.cart.adds().is_empty());
    assert!(harness
        .last_spoken()
        .starts_with("Sorry, I couldn't find any falafel."));

    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.total_commands, 2);
    assert_eq!(metrics.successful_commands, 1);
}

#[tokio::test(start_paused = true)]
async fn test_add_naming_product_during_outage_adds_nothing() {
    let harness = HarnessBuilder::new().catalog(FakeCatalog::failing()).build();

    harness.say("add 2 hummus to my cart").await;

    assert!(harness.cart.adds().is_empty());
    assert_eq!(
        harness.last_spoken(),
        "Sorry, I'm having trouble searching right now. Please try again in a moment."
    );
}

#[tokio::test(start_paused = true)]
async fn test_reorder_and_help_replies() {
    let harness = Harness::new();

    harness.say("show me hummus").await;
    harness.say("buy again").await;
    assert!(harness.cart.adds().is_empty());
    assert_eq!(
        harness.last_spoken(),
        "I can't repeat a past order yet, but tell me what you'd like and I'll find it for you."
    );

    harness.say("order again").await;
    assert_eq!(
        harness.last_spoken(),
        "I can't repeat a past order yet, but tell me what you'd like and I'll find it for you."
    );

    harness.say("help").await;
    assert_eq!(
        harness.last_spoken(),
        "You can ask me to search for a product, add it to your cart, tell you what's in your cart, browse a vendor, or check out."
    );

    let history = harness.commerce.history().await;
    let sources: Vec<_> = history.iter().skip(1).map(|turn| turn.source).collect();
    assert_eq!(
        sources,
        vec![
            Some(ResolutionSource::Pattern(PatternCommand::Reorder)),
            Some(ResolutionSource::Pattern(PatternCommand::Reorder)),
            Some(ResolutionSource::Pattern(PatternCommand::Help)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deal_words_inside_a_product_query_search() {
    let harness = Harness::new();

    harness.say("search for special cheese").await;
    assert_eq!(harness.catalog.queries(), vec!["special cheese"]);

    harness.say("any deals today").await;
    assert_eq!(harness.catalog.queries().len(), 1);
    assert!(harness.last_spoken().starts_with("Today's deals are on the home page."));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_superseded_turn_is_discarded() {
    let enhancer = Arc::new(FakeEnhancer::new(EnhancerBehavior::Echo {
        delay: Duration::from_secs(1),
    }));
    let harness = HarnessBuilder::new().enhancer(enhancer.clone()).build();

    harness.commerce.submit_transcript("show me bread");
    // First turn is now waiting on the enhancer
    tokio::time::sleep(Duration::from_millis(700)).await;
    harness.commerce.submit_transcript("show me cheese");
    tokio::time::sleep(SETTLE).await;

    assert_eq!(
        *enhancer.calls.lock().unwrap(),
        vec!["show me bread", "show me cheese"]
    );
    assert_eq!(harness.catalog.queries(), vec!["cheese"]);
    assert_eq!(harness.spoken().len(), 1);
    assert!(harness.last_spoken().starts_with("I found 2 results for cheese."));

    let history = harness.commerce.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].turn_id, 2);
    assert_eq!(history[0].source, Some(ResolutionSource::Enhanced));
    assert!(!harness.tracker.is_timer_running(TIMER_TOTAL));
}

#[tokio::test(start_paused = true)]
async fn test_slow_enhancer_times_out_to_patterns() {
    let enhancer = Arc::new(FakeEnhancer::new(EnhancerBehavior::Hanging));
    let harness = HarnessBuilder::new().enhancer(enhancer).build();

    harness.say("show me hummus").await;

    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    assert_eq!(
        harness.last_spoken(),
        "I found 1 result for hummus. The top result is Hummus from Galilee Farms for 22 shekels."
    );
    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.errors_by_category.get("enhancement"), Some(&1));
    assert_eq!(
        harness.commerce.history().await[0].source,
        Some(ResolutionSource::Pattern(PatternCommand::Search))
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_enhancer_still_answers() {
    let enhancer = Arc::new(FakeEnhancer::new(EnhancerBehavior::Failing));
    let harness = HarnessBuilder::new().enhancer(enhancer).build();

    harness.say("show me hummus").await;
    harness.say("the weather is lovely").await;

    let spoken = harness.spoken();
    assert_eq!(spoken.len(), 2);
    assert!(spoken[0].starts_with("I found 1 result for hummus."));
    assert_eq!(spoken[1], DIDNT_CATCH);

    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.errors_by_category.get("enhancement"), Some(&2));
    assert_eq!(metrics.total_commands, 2);
    assert_eq!(metrics.successful_commands, 1);
    assert_eq!(metrics.intent_counts.get("unknown"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_answer_runs_as_new_command() {
    let harness = HarnessBuilder::new()
        .config(policy(AmbiguousConfirmationPolicy::TreatAsNewCommand))
        .cart(RecordingCart::with_total(600.0))
        .build();

    harness.say("checkout").await;
    harness.say("show me hummus").await;

    assert!(harness.navigator.paths().is_empty());
    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    assert!(harness.last_spoken().starts_with("I found 1 result for hummus."));
    assert!(harness.commerce.pending_confirmation().await.is_none());
    assert_eq!(harness.commerce.state(), DialogueState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_answer_reprompts_once() {
    let harness = HarnessBuilder::new()
        .config(policy(AmbiguousConfirmationPolicy::RepromptOnce))
        .cart(RecordingCart::with_total(600.0))
        .build();

    harness.say("checkout").await;
    harness.say("hmm let me think").await;

    assert_eq!(
        harness.last_spoken(),
        "Sorry, I need a yes or a no. Your total is 600 shekels. Would you like to proceed to checkout?"
    );
    let pending = harness.commerce.pending_confirmation().await.unwrap();
    assert!(pending.reprompted);
    assert_eq!(harness.commerce.state(), DialogueState::AwaitingConfirmation);

    // A second unclear answer gives up on the checkout
    harness.say("show me hummus").await;

    assert!(harness.navigator.paths().is_empty());
    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
    assert!(harness.commerce.pending_confirmation().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_answer_treated_as_no() {
    let harness = HarnessBuilder::new()
        .config(policy(AmbiguousConfirmationPolicy::TreatAsNo))
        .cart(RecordingCart::with_total(600.0))
        .build();

    harness.say("checkout").await;
    harness.say("show me hummus").await;

    assert_eq!(harness.last_spoken(), CANCELLED);
    assert!(harness.catalog.queries().is_empty());
    assert!(harness.navigator.paths().is_empty());
    assert!(harness.commerce.pending_confirmation().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transcripts_dropped_while_speaking() {
    let harness = HarnessBuilder::new()
        .speech(Duration::from_secs(2))
        .build();

    assert_eq!(harness.commerce.submit_transcript("hello"), Some(1));
    tokio::time::sleep(Duration::from_millis(700)).await;

    assert!(harness.commerce.is_speaking());
    assert_eq!(harness.commerce.submit_transcript("show me hummus"), None);

    tokio::time::sleep(SETTLE).await;
    assert!(!harness.commerce.is_speaking());
    assert!(harness.catalog.queries().is_empty());
    assert_eq!(harness.commerce.submit_transcript("show me hummus"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_blank_transcript_is_ignored() {
    let harness = Harness::new();

    assert_eq!(harness.commerce.submit_transcript("   "), None);
    tokio::time::sleep(SETTLE).await;

    assert!(harness.spoken().is_empty());
    assert_eq!(harness.commerce.current_turn(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recognition_events() {
    let harness = Harness::new();
    let commerce = &harness.commerce;

    assert_eq!(
        commerce
            .handle_recognition_event(RecognitionEvent::Interim("show me".to_string()))
            .await,
        None
    );
    assert!(harness.tracker.is_timer_running(TIMER_RECOGNITION));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let turn = commerce
        .handle_recognition_event(RecognitionEvent::Final("show me hummus".to_string()))
        .await;
    assert_eq!(turn, Some(1));
    assert!(!harness.tracker.is_timer_running(TIMER_RECOGNITION));
    tokio::time::sleep(SETTLE).await;

    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.timers[TIMER_RECOGNITION].count, 1);
    assert_eq!(metrics.timers[TIMER_SEARCH].count, 1);
    assert_eq!(metrics.timers[TIMER_TOTAL].count, 1);
    assert_eq!(harness.catalog.queries(), vec!["hummus"]);
}

#[tokio::test(start_paused = true)]
async fn test_recognition_errors() {
    let harness = Harness::new();
    let commerce = &harness.commerce;

    commerce
        .handle_recognition_event(RecognitionEvent::Interim("sh".to_string()))
        .await;
    commerce
        .handle_recognition_event(RecognitionEvent::Error(RecognitionError::NoSpeech))
        .await;
    assert!(!harness.tracker.is_timer_running(TIMER_RECOGNITION));
    assert_eq!(
        harness.spoken(),
        vec![RecognitionError::NoSpeech.user_message()]
    );

    commerce
        .handle_recognition_event(RecognitionEvent::Error(RecognitionError::Aborted))
        .await;
    assert_eq!(harness.spoken().len(), 1);

    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.errors_by_category.get("recognition"), Some(&2));
    assert!(!metrics.timers.contains_key(TIMER_RECOGNITION));
}

#[tokio::test(start_paused = true)]
async fn test_vendor_roster_and_vendor_search() {
    let harness = Harness::new();

    harness.say("which vendors do you have").await;
    assert_eq!(
        harness.last_spoken(),
        "Our vendors are Galilee Farms, Jaffa Bakery, Negev Dairy and Carmel Spice House. Which one would you like to browse?"
    );
    assert!(harness.catalog.queries().is_empty());

    harness.say("show me products from jaffa bakery").await;
    assert_eq!(harness.catalog.queries(), vec!["jaffa bakery"]);
    assert_eq!(
        harness.last_spoken(),
        "Jaffa Bakery has 1 product. Their top item is Sourdough Bread for 18 shekels."
    );
    assert_eq!(
        harness.commerce.current_product().await.map(|p| p.name),
        Some("Sourdough Bread".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_price_filter_narrows_results() {
    let harness = Harness::new();

    harness.say("show me cheese under 40 shekels").await;

    assert_eq!(harness.catalog.queries(), vec!["cheese"]);
    assert_eq!(
        harness.last_spoken(),
        "I found 1 result for cheese under 40 shekels. The top result is Goat Cheese from Negev Dairy for 35 shekels."
    );
    let results = harness.commerce.search_results().await;
    assert_eq!(results.len(), 1);
    assert!(results.iter().all(|p| p.price <= 40.0));
}

#[tokio::test(start_paused = true)]
async fn test_catalog_outage_is_reported() {
    let harness = HarnessBuilder::new().catalog(FakeCatalog::failing()).build();

    harness.say("show me hummus").await;

    assert_eq!(
        harness.last_spoken(),
        "Sorry, I'm having trouble searching right now. Please try again in a moment."
    );
    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.errors_by_category.get("search"), Some(&1));
    assert_eq!(metrics.successful_commands, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cart_failure_falls_back_to_apology() {
    let harness = HarnessBuilder::new().cart(RecordingCart::failing()).build();

    harness.say("show me hummus").await;
    harness.say("add it to my cart").await;

    assert_eq!(harness.cart.adds().len(), 1);
    assert_eq!(harness.last_spoken(), DIDNT_CATCH);
    let metrics = harness.tracker.get_aggregate_metrics();
    assert_eq!(metrics.errors_by_category.get("dispatch"), Some(&1));
    assert_eq!(harness.commerce.state(), DialogueState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_informational_intents() {
    let harness = HarnessBuilder::new()
        .catalog(FakeCatalog::new(market()))
        .cart(RecordingCart::with_total(40.0))
        .build();

    harness.say("hello").await;
    assert!(harness.last_spoken().starts_with("Hi! I can help you find products"));

    harness.say("what's in my cart").await;
    assert_eq!(
        harness.last_spoken(),
        "You have 1 item in your cart: Weekly Box. Your total is 40 shekels."
    );

    harness.say("what are your best sellers").await;
    assert_eq!(
        harness.last_spoken(),
        "Our most popular items right now are Hummus, Sourdough Bread and Vanilla Ice Cream. Would you like to hear more about one of them?"
    );
    assert_eq!(harness.catalog.queries(), vec![""]);

    let history = harness.commerce.history().await;
    let intents: Vec<Intent> = history.iter().map(|turn| turn.intent).collect();
    assert_eq!(
        intents,
        vec![Intent::Greeting, Intent::ShowCart, Intent::AskAbout]
    );
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions_are_published() {
    let harness = HarnessBuilder::new()
        .cart(RecordingCart::with_total(600.0))
        .build();
    let mut states = harness.commerce.subscribe_state();
    assert_eq!(*states.borrow(), DialogueState::Idle);

    harness.commerce.submit_transcript("checkout");
    assert_eq!(harness.commerce.state(), DialogueState::Debouncing);
    assert!(states.has_changed().unwrap());

    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        *states.borrow_and_update(),
        DialogueState::AwaitingConfirmation
    );
}

//! Local command table used when the AI enhancer is unavailable or unsure.
//!
//! Entries are tried in [`PatternCommand::ORDERED`] order and the first match
//! wins, so specific commands ("add it to my cart", "show me deals") sit
//! ahead of the catch-all product search.

use super::{Entities, Intent, IntentResolution, PriceRange};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Confidence reported for a pattern-table match
pub const PATTERN_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCommand {
    AddToCart,
    Checkout,
    CartInfo,
    ShowDeals,
    BestSellers,
    Reorder,
    Help,
    Greeting,
    BrowseVendor,
    PriceFilter,
    Search,
}

static ADD_TO_CART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:please\s+)?(?:add|put|buy|i'?ll take|i will take)\b\s*(?P<rest>.*?)(?:\s*\b(?:to|in|into)\s+(?:my\s+|the\s+)?(?:cart|basket))?$",
    )
    .expect("valid add-to-cart pattern")
});

static CHECKOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:check\s?out|pay(?:\s+now)?|place\s+(?:my|the)\s+order|complete\s+(?:my|the)\s+(?:order|purchase)|finish\s+(?:my|the)\s+order)\b",
    )
    .expect("valid checkout pattern")
});

static CART_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:what'?s|what\s+is)\s+in\s+(?:my|the)\s+(?:cart|basket)|\b(?:show|read|tell)\s+(?:me\s+)?(?:my|the)\s+(?:cart|basket)|\bmy\s+(?:cart|basket)\b|\bcart\s+total\b|\b(?:what'?s|what\s+is)\s+my\s+total\b|\bhow\s+much\s+(?:is\s+my|have\s+i\s+spent|do\s+i\s+owe)",
    )
    .expect("valid cart-info pattern")
});

// Deals words only count as the whole request ("show me today's deals"),
// never inside a product query ("search for special cheese")
static SHOW_DEALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:show\s+me|tell\s+me\s+about|what\s+are|are\s+there|do\s+you\s+have|any|list)\s+)?(?:(?:the|your|any|some|today'?s|current|this\s+week'?s)\s+)*(?:deals?|discounts?|specials?|offers?|promotions?)(?:\s+(?:today|now|this\s+week|for\s+me|please|available))*$|^what'?s\s+on\s+sale\b",
    )
    .expect("valid deals pattern")
});

static BEST_SELLERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:best\s?sellers?|best\s+selling|most\s+popular|popular\s+(?:items|products)|top\s+sellers?|trending)\b",
    )
    .expect("valid best-sellers pattern")
});

static REORDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:re-?order|order\s+again|buy\s+again|same\s+as\s+last\s+time|my\s+usual)\b")
        .expect("valid reorder pattern")
});

static HELP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:help\b|what\s+can\s+you\s+do|how\s+does\s+this\s+work|what\s+can\s+i\s+say)|\bhelp\s+me\b")
        .expect("valid help pattern")
});

static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:hi|hello|hey|hiya|shalom|good\s+(?:morning|afternoon|evening))\b")
        .expect("valid greeting pattern")
});

static BROWSE_VENDOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:vendors?|sellers?|shops?|stores?)\b|^(?:show\s+me\s+|what\s+do\s+you\s+have\s+)?(?:products|items|everything|anything|stuff)\s+(?:from|by)\s+",
    )
    .expect("valid vendor pattern")
});

static VENDOR_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:from|by)\s+(?:the\s+)?(?P<vendor>[\p{L}0-9][\p{L}0-9'&\s]*?)(?:\s+(?:vendor|shop|store))?$")
        .expect("valid vendor name pattern")
});

static PRICE_BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bbetween\s+(?P<min>\d+(?:\.\d+)?)\s+and\s+(?P<max>\d+(?:\.\d+)?)(?:\s*(?:shekels?|nis|₪))?",
    )
    .expect("valid price-between pattern")
});

static PRICE_MAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:under|below|less\s+than|cheaper\s+than|up\s+to|at\s+most|max(?:imum)?)\s+(?P<max>\d+(?:\.\d+)?)(?:\s*(?:shekels?|nis|₪))?",
    )
    .expect("valid max-price pattern")
});

static PRICE_MIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:over|above|more\s+than|at\s+least|min(?:imum)?)\s+(?P<min>\d+(?:\.\d+)?)(?:\s*(?:shekels?|nis|₪))?",
    )
    .expect("valid min-price pattern")
});

static SEARCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:can|could)\s+you\s+|please\s+)?(?:show\s+me|find\s+me|find|search\s+for|search|look\s+for|looking\s+for|i'?m\s+looking\s+for|i\s+want|i\s+need|i'?d\s+like|do\s+you\s+have|get\s+me)\s+(?P<query>.+)$",
    )
    .expect("valid search pattern")
});

static LEADING_FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:some|any|a|an|the|me)\s+)+").expect("valid filler pattern")
});

const PRONOUNS: &[&str] = &["it", "this", "that", "one", "this one", "that one", "them"];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("a", 1),
    ("an", 1),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("a dozen", 12),
];

/// A successful table lookup
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub command: PatternCommand,
    pub entities: Entities,
}

impl PatternMatch {
    pub fn into_resolution(self) -> IntentResolution {
        IntentResolution {
            intent: self.command.intent(),
            enhanced_query: self.entities.product.clone(),
            entities: self.entities,
            confidence: PATTERN_CONFIDENCE,
            suggested_response: None,
        }
    }
}

impl PatternCommand {
    /// Evaluation order of the table
    pub const ORDERED: [PatternCommand; 11] = [
        PatternCommand::AddToCart,
        PatternCommand::Checkout,
        PatternCommand::CartInfo,
        PatternCommand::ShowDeals,
        PatternCommand::BestSellers,
        PatternCommand::Reorder,
        PatternCommand::Help,
        PatternCommand::Greeting,
        PatternCommand::BrowseVendor,
        PatternCommand::PriceFilter,
        PatternCommand::Search,
    ];

    pub fn intent(self) -> Intent {
        match self {
            PatternCommand::AddToCart => Intent::AddToCart,
            PatternCommand::Checkout => Intent::Checkout,
            PatternCommand::CartInfo => Intent::ShowCart,
            PatternCommand::ShowDeals => Intent::ShowDeals,
            PatternCommand::BestSellers | PatternCommand::Reorder | PatternCommand::Help => {
                Intent::AskAbout
            }
            PatternCommand::Greeting => Intent::Greeting,
            PatternCommand::BrowseVendor => Intent::BrowseVendor,
            PatternCommand::PriceFilter | PatternCommand::Search => Intent::SearchProduct,
        }
    }

    /// Entities for a normalized utterance, or `None` if this entry does not apply
    pub fn matches(self, text: &str) -> Option<Entities> {
        match self {
            PatternCommand::AddToCart => {
                // "buy again" asks for a reorder, not for a product called "again"
                if REORDER.is_match(text) {
                    return None;
                }
                let caps = ADD_TO_CART.captures(text)?;
                let rest = caps.name("rest").map_or("", |m| m.as_str());
                let (quantity, product) = split_quantity(rest);
                Some(Entities {
                    quantity,
                    product: product.filter(|p| !PRONOUNS.contains(&p.as_str())),
                    ..Default::default()
                })
            }
            PatternCommand::Checkout => CHECKOUT.is_match(text).then(Entities::default),
            PatternCommand::CartInfo => CART_INFO.is_match(text).then(Entities::default),
            PatternCommand::ShowDeals => SHOW_DEALS.is_match(text).then(Entities::default),
            PatternCommand::BestSellers => BEST_SELLERS.is_match(text).then(Entities::default),
            PatternCommand::Reorder => REORDER.is_match(text).then(Entities::default),
            PatternCommand::Help => HELP.is_match(text).then(Entities::default),
            PatternCommand::Greeting => GREETING.is_match(text).then(Entities::default),
            PatternCommand::BrowseVendor => {
                if !BROWSE_VENDOR.is_match(text) {
                    return None;
                }
                let vendor = VENDOR_NAME
                    .captures(text)
                    .and_then(|caps| caps.name("vendor"))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty());
                Some(Entities {
                    vendor,
                    ..Default::default()
                })
            }
            PatternCommand::PriceFilter => {
                let (range, remainder) = extract_price_range(text);
                let range = range?;
                let product = SEARCH
                    .captures(&remainder)
                    .and_then(|caps| caps.name("query").map(|m| m.as_str().to_string()))
                    .or_else(|| Some(remainder.clone()))
                    .and_then(|query| clean_query(&query));
                Some(Entities {
                    product,
                    price_range: Some(range),
                    ..Default::default()
                })
            }
            PatternCommand::Search => {
                let caps = SEARCH.captures(text)?;
                let query = caps.name("query")?.as_str();
                let product = clean_query(query)?;
                Some(Entities {
                    product: Some(product),
                    ..Default::default()
                })
            }
        }
    }
}

/// Lowercase, trim, drop trailing punctuation, collapse whitespace
pub fn normalize(transcript: &str) -> String {
    transcript
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';'))
        .trim()
        .to_string()
}

/// Run the table against a raw transcript
pub fn match_command(transcript: &str) -> Option<PatternMatch> {
    let text = normalize(transcript);
    if text.is_empty() {
        return None;
    }

    PatternCommand::ORDERED.iter().find_map(|command| {
        command.matches(&text).map(|entities| PatternMatch {
            command: *command,
            entities,
        })
    })
}

/// Pull a price bound out of the text, returning what is left
pub fn extract_price_range(text: &str) -> (Option<PriceRange>, String) {
    let parse = |caps: &regex::Captures, name: &str| {
        caps.name(name).and_then(|m| m.as_str().parse::<f64>().ok())
    };

    if let Some(caps) = PRICE_BETWEEN.captures(text) {
        let range = PriceRange {
            min: parse(&caps, "min"),
            max: parse(&caps, "max"),
        };
        return (Some(range), strip_match(text, &PRICE_BETWEEN));
    }
    if let Some(caps) = PRICE_MAX.captures(text) {
        let range = PriceRange {
            min: None,
            max: parse(&caps, "max"),
        };
        return (Some(range), strip_match(text, &PRICE_MAX));
    }
    if let Some(caps) = PRICE_MIN.captures(text) {
        let range = PriceRange {
            min: parse(&caps, "min"),
            max: None,
        };
        return (Some(range), strip_match(text, &PRICE_MIN));
    }
    (None, text.to_string())
}

fn strip_match(text: &str, pattern: &Regex) -> String {
    pattern
        .replace(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_query(query: &str) -> Option<String> {
    let (_, without_price) = extract_price_range(query);
    let cleaned = LEADING_FILLER.replace(without_price.trim(), "");
    let cleaned = cleaned
        .trim()
        .trim_end_matches(" please")
        .trim_end_matches(" for me")
        .trim();
    match cleaned {
        "" | "anything" | "something" | "stuff" | "things" | "products" | "items" => None,
        other => Some(other.to_string()),
    }
}

fn split_quantity(rest: &str) -> (Option<u32>, Option<String>) {
    let rest = rest.trim();
    if rest.is_empty() {
        return (None, None);
    }

    // Longest number phrase first so "a dozen" beats "a"
    let mut words = NUMBER_WORDS.to_vec();
    words.sort_by_key(|(word, _)| std::cmp::Reverse(word.len()));

    let first = rest.split_whitespace().next().unwrap_or_default();
    let (quantity, remainder) = if let Ok(n) = first.parse::<u32>() {
        (Some(n), rest[first.len()..].trim())
    } else if let Some((word, n)) = words.iter().find(|(word, _)| {
        rest == *word
            || rest
                .strip_prefix(word)
                .is_some_and(|tail| tail.starts_with(' '))
    }) {
        (Some(*n), rest[word.len()..].trim())
    } else {
        (None, rest)
    };

    let remainder = remainder
        .trim_start_matches("of ")
        .trim_start_matches("more ")
        .trim();
    let product = LEADING_FILLER.replace(remainder, "").trim().to_string();
    let product = (!product.is_empty()).then_some(product);

    // "a" alone is an article, not an order for one
    let quantity = match (quantity, &product) {
        (Some(1), _) if matches!(first, "a" | "an") => None,
        (quantity, _) => quantity,
    };

    (quantity, product)
}

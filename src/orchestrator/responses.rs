// Spoken response templates

use crate::commerce::{format_amount, CartItem, Product};
use crate::config::CommerceConfig;
use crate::intent::PriceRange;

pub const CANCELLED: &str = "Okay, I've cancelled that.";
pub const DIDNT_CATCH: &str =
    "Sorry, I didn't catch that. You can say things like \"show me hummus\", \"add it to my cart\" or \"checkout\".";
pub const EMPTY_CART: &str = "Your cart is empty. Add some items before checking out.";

/// "a", "a and b", "a, b and c"
pub fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[derive(Debug, Clone)]
pub struct ResponseTemplates {
    currency: String,
    vendor_roster: Vec<String>,
    search_suggestions: Vec<String>,
}

impl ResponseTemplates {
    pub fn from_config(config: &CommerceConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            vendor_roster: config.vendor_roster.clone(),
            search_suggestions: config.search_suggestions.clone(),
        }
    }

    pub fn money(&self, amount: f64) -> String {
        format!("{} {}", format_amount(amount), self.currency)
    }

    pub fn price_range(&self, range: &PriceRange) -> String {
        match (range.min, range.max) {
            (Some(min), Some(max)) => format!(
                "between {} and {}",
                format_amount(min),
                self.money(max)
            ),
            (None, Some(max)) => format!("under {}", self.money(max)),
            (Some(min), None) => format!("over {}", self.money(min)),
            (None, None) => String::new(),
        }
    }

    pub fn search_results(&self, label: &str, results: &[Product]) -> String {
        let Some(top) = results.first() else {
            return self.not_found(label);
        };
        let count = if results.len() == 1 {
            "1 result".to_string()
        } else {
            format!("{} results", results.len())
        };
        let from = if top.vendor.is_empty() {
            String::new()
        } else {
            format!(" from {}", top.vendor)
        };
        format!(
            "I found {} for {}. The top result is {}{} for {}.",
            count,
            label,
            top.name,
            from,
            self.money(top.price)
        )
    }

    pub fn not_found(&self, label: &str) -> String {
        let suggestions: Vec<String> = self
            .search_suggestions
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect();
        if suggestions.is_empty() {
            format!("Sorry, I couldn't find any {}.", label)
        } else {
            format!(
                "Sorry, I couldn't find any {}. You could try searching for {} instead.",
                label,
                join_natural(&suggestions).replace(" and ", " or ")
            )
        }
    }

    pub fn ask_for_query(&self) -> String {
        "What would you like me to search for?".to_string()
    }

    pub fn search_failed(&self) -> String {
        "Sorry, I'm having trouble searching right now. Please try again in a moment."
            .to_string()
    }

    pub fn added(&self, product: &Product, quantity: u32, total: f64) -> String {
        let what = if quantity > 1 {
            format!("{} {}", quantity, product.name)
        } else {
            product.name.clone()
        };
        format!(
            "I've added {} to your cart. Your total is now {}.",
            what,
            self.money(total)
        )
    }

    pub fn cart_summary(&self, items: &[CartItem], total: f64) -> String {
        if items.is_empty() {
            return "Your cart is empty.".to_string();
        }
        let units: u32 = items.iter().map(|item| item.quantity).sum();
        let names: Vec<String> = items
            .iter()
            .take(3)
            .map(|item| match item.quantity {
                1 => item.product.name.clone(),
                n => format!("{} {}", n, item.product.name),
            })
            .collect();
        let more = if items.len() > 3 { " and more" } else { "" };
        format!(
            "You have {} {} in your cart: {}{}. Your total is {}.",
            units,
            if units == 1 { "item" } else { "items" },
            join_natural(&names),
            more,
            self.money(total)
        )
    }

    pub fn checkout(&self, total: f64) -> String {
        format!(
            "Your total is {}. Taking you to checkout now.",
            self.money(total)
        )
    }

    pub fn vendor_roster(&self) -> String {
        if self.vendor_roster.is_empty() {
            return "I don't have a vendor list right now. Try searching for a product instead."
                .to_string();
        }
        format!(
            "Our vendors are {}. Which one would you like to browse?",
            join_natural(&self.vendor_roster)
        )
    }

    pub fn vendor_results(&self, vendor: &str, results: &[Product]) -> String {
        match results.first() {
            Some(top) => format!(
                "{} has {} {}. Their top item is {} for {}.",
                vendor,
                results.len(),
                if results.len() == 1 { "product" } else { "products" },
                top.name,
                self.money(top.price)
            ),
            None => format!(
                "I couldn't find any products from {}. {}",
                vendor,
                self.vendor_roster()
            ),
        }
    }

    pub fn best_sellers(&self, products: &[Product]) -> String {
        if products.is_empty() {
            return self.help();
        }
        let names: Vec<String> = products.iter().take(3).map(|p| p.name.clone()).collect();
        format!(
            "Our most popular items right now are {}. Would you like to hear more about one of them?",
            join_natural(&names)
        )
    }

    pub fn greeting(&self) -> String {
        "Hi! I can help you find products, add them to your cart, and check out. What are you looking for today?".to_string()
    }

    pub fn help(&self) -> String {
        "You can ask me to search for a product, add it to your cart, tell you what's in your cart, browse a vendor, or check out.".to_string()
    }

    pub fn deals(&self) -> String {
        "Today's deals are on the home page. Tell me a product and I'll check its price for you."
            .to_string()
    }

    pub fn reorder(&self) -> String {
        "I can't repeat a past order yet, but tell me what you'd like and I'll find it for you."
            .to_string()
    }

    pub fn reprompt(&self, prompt: &str) -> String {
        format!("Sorry, I need a yes or a no. {}", prompt)
    }

    pub fn checkout_confirmed(&self, total: f64) -> String {
        format!(
            "Great. Your total is {}. Taking you to checkout now.",
            self.money(total)
        )
    }
}

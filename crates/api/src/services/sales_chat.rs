//! AI sales assistant grounded in live inventory.
//!
//! Each question is reduced to keywords, matched against in-stock products,
//! and answered by the Groq model with the matching stock embedded in the
//! system prompt. Inventory lookups are cached for a short time.

use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use moka::future::Cache;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::pricing::sale_price;

use crate::db::{ProductRepository, RepositoryError};
use crate::groq::{ChatMessage, GroqClient, GroqError, Role};
use crate::models::Product;

/// Maximum products embedded in one prompt.
const MAX_PRODUCTS: i64 = 5;

/// Inventory snippets are reused for this long.
const INVENTORY_CACHE_TTL: Duration = Duration::from_secs(30);

/// Below this many units the assistant may mention scarcity.
const LOW_STOCK_THRESHOLD: i32 = 5;

/// Reply when no model API key is configured.
pub const UNCONFIGURED_REPLY: &str = "The sales assistant is not configured.";

/// Reply when the model call fails.
pub const BUSY_REPLY: &str = "Service temporarily busy.";

const GENERIC_CONTEXT: &str = "The customer is asking a general question or about visiting. \
Do not say that no products are available unless they ask for a specific model that is out of stock.";

const SHOWROOM_DETAILS: &str = "Our flagship showroom is open daily from 10:00 AM to 10:00 PM. \
Our experts will be waiting to assist you with the final inspection.";

static FILLER_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:price|instock|available|check|show|is|the|not)\b").expect("Invalid regex")
});

const VISIT_WORDS: &[&str] = &[
    "visit",
    "appointment",
    "coming",
    "showroom",
    "today",
    "tomorrow",
    "reach",
];

const LOCATION_WORDS: &[&str] = &["showroom", "location"];

/// Errors from answering a chat message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("model error: {0}")]
    Model(#[from] GroqError),

    #[error("inventory lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// One prior turn as sent by the storefront widget.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<HistoryPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPart {
    pub text: String,
}

impl HistoryTurn {
    /// Convert to a model message. `model` turns become assistant turns.
    fn to_message(&self) -> Option<ChatMessage> {
        let text = self.parts.first()?.text.clone();
        let role = if self.role == "model" {
            Role::Assistant
        } else {
            Role::User
        };
        Some(ChatMessage::new(role, text))
    }
}

/// The sales assistant.
#[derive(Clone)]
pub struct SalesChat {
    groq: GroqClient,
    inventory: Cache<String, Arc<str>>,
}

impl SalesChat {
    #[must_use]
    pub fn new(groq: GroqClient) -> Self {
        let inventory = Cache::builder()
            .max_capacity(500)
            .time_to_live(INVENTORY_CACHE_TTL)
            .build();
        Self { groq, inventory }
    }

    /// Answer a customer message in the context of prior turns.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repository` if the inventory lookup fails, or
    /// `ChatError::Model` if the model call fails.
    #[instrument(skip(self, pool, message, history), fields(history = history.len()))]
    pub async fn reply(
        &self,
        pool: &PgPool,
        message: &str,
        history: &[HistoryTurn],
    ) -> Result<String, ChatError> {
        let keywords = extract_keywords(message);
        let context = self.inventory_context(pool, &keywords).await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(Role::System, system_prompt(&context)));
        messages.extend(history.iter().filter_map(HistoryTurn::to_message));
        messages.push(ChatMessage::new(Role::User, message));

        Ok(self.groq.complete(&messages).await?)
    }

    async fn inventory_context(
        &self,
        pool: &PgPool,
        keywords: &[String],
    ) -> Result<Arc<str>, ChatError> {
        let key = keywords.join(" ");
        if let Some(cached) = self.inventory.get(&key).await {
            tracing::debug!(keywords = %key, "Inventory cache hit");
            return Ok(cached);
        }

        let products = ProductRepository::new(pool)
            .search_in_stock(keywords, MAX_PRODUCTS)
            .await?;
        let context: Arc<str> = inventory_snippet(&products).into();
        self.inventory.insert(key, Arc::clone(&context)).await;
        Ok(context)
    }
}

/// Reduce a customer message to search keywords.
///
/// Filler words are removed as whole words, punctuation is dropped, and only
/// words longer than two characters survive.
#[must_use]
pub fn extract_keywords(message: &str) -> Vec<String> {
    let cleaned = FILLER_WORDS.replace_all(message, " ");
    let mut keywords: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if word.chars().count() > 2 && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

/// Render the inventory block embedded in the system prompt.
#[must_use]
pub fn inventory_snippet(products: &[Product]) -> String {
    if products.is_empty() {
        return GENERIC_CONTEXT.to_string();
    }
    products
        .iter()
        .map(product_record)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn product_record(product: &Product) -> String {
    let sale = sale_price(
        product.price,
        product.discount_percentage,
        product.discount_price,
    )
    .map_or_else(|| "NONE".to_string(), dollars);

    let mut record = String::new();
    let _ = writeln!(record, "PRODUCT_RECORD");
    let _ = writeln!(record, "Name: {} {}", product.brand, product.name);
    let _ = writeln!(record, "StandardPrice: {}", dollars(product.price));
    let _ = writeln!(record, "SalePrice: {sale}");
    let _ = writeln!(record, "UnitsAvailable: {}", product.quantity);
    for field in [&product.processor, &product.ram, &product.storage]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(record, "Spec: {field}");
    }
    let _ = writeln!(record);
    let _ = writeln!(record, "RULES:");
    let _ = writeln!(record, "- Use ONLY the above numbers.");
    let _ = writeln!(record, "- If SalePrice is NONE, use StandardPrice as final price.");
    let _ = writeln!(record, "- Never estimate or infer stock.");
    let _ = writeln!(
        record,
        "- If UnitsAvailable >= {LOW_STOCK_THRESHOLD}, DO NOT use scarcity language."
    );
    let _ = write!(
        record,
        "- If UnitsAvailable < {LOW_STOCK_THRESHOLD}, you MAY use scarcity language."
    );
    record
}

fn dollars(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

fn system_prompt(inventory: &str) -> String {
    format!(
        "You are the senior sales concierge at Bazaar, a technology retailer.\n\
         Be concise and confident. Lead with the answer, use short sentences, and never use Markdown.\n\
         \n\
         INVENTORY CONTEXT:\n\
         {inventory}\n\
         \n\
         PRICING:\n\
         - A SalePrice always takes priority when available.\n\
         - Quote discounted items as: Exclusive Offer: $[SalePrice] (Previously $[StandardPrice]).\n\
         - Never estimate, negotiate or change a price.\n\
         \n\
         STOCK:\n\
         - Below {LOW_STOCK_THRESHOLD} units you may say how many remain and offer to hold one.\n\
         - Otherwise offer a side-by-side comparison with similar models.\n\
         \n\
         SHOWROOM:\n\
         - When the customer wants to visit or collect in person, say: \"{SHOWROOM_DETAILS}\"\n\
         \n\
         Decline questions unrelated to Bazaar's products and steer back to the customer's needs.\n\
         End every reply with a single consultative question."
    )
}

/// Whether an exchange shows the customer intends to visit the showroom.
///
/// The customer must mention a visit and the reply must point them to the
/// showroom or its location.
#[must_use]
pub fn is_visit_intent(message: &str, reply: &str) -> bool {
    let message = message.to_lowercase();
    let reply = reply.to_lowercase();
    VISIT_WORDS.iter().any(|w| message.contains(w))
        && LOCATION_WORDS.iter().any(|w| reply.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::ProductId;
    use chrono::Utc;

    fn product(quantity: i32, pct: i64, discount_price: Option<Decimal>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "ZenBook 14".to_string(),
            brand: "Asus".to_string(),
            description: String::new(),
            price: Decimal::new(1200, 0),
            category: "Laptops".to_string(),
            image: None,
            images: Vec::new(),
            processor: Some("Core i7".to_string()),
            ram: None,
            storage: None,
            display: None,
            offer_message: None,
            on_sale: false,
            quantity,
            discount_percentage: Decimal::new(pct, 0),
            discount_price,
            rating: Decimal::ZERO,
            num_reviews: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_keywords_strips_filler_words() {
        let got = extract_keywords("Is the Dell XPS available? Check price!");
        assert_eq!(got, vec!["dell", "xps"]);
    }

    #[test]
    fn test_extract_keywords_keeps_words_containing_filler() {
        // "this" and "island" contain "is" but are not the filler word itself.
        let got = extract_keywords("this island laptop");
        assert_eq!(got, vec!["this", "island", "laptop"]);
    }

    #[test]
    fn test_extract_keywords_drops_short_words_and_duplicates() {
        assert_eq!(extract_keywords("hp hp HP 16gb 16GB"), vec!["16gb"]);
        assert!(extract_keywords("is it ok").is_empty());
    }

    #[test]
    fn test_inventory_snippet_with_sale_price() {
        let snippet = inventory_snippet(&[product(3, 10, None)]);
        assert!(snippet.starts_with("PRODUCT_RECORD"));
        assert!(snippet.contains("Name: Asus ZenBook 14"));
        assert!(snippet.contains("StandardPrice: $1200.00"));
        assert!(snippet.contains("SalePrice: $1080.00"));
        assert!(snippet.contains("UnitsAvailable: 3"));
        assert!(snippet.contains("Spec: Core i7"));
    }

    #[test]
    fn test_inventory_snippet_without_discount() {
        let snippet = inventory_snippet(&[product(8, 0, None)]);
        assert!(snippet.contains("SalePrice: NONE"));
    }

    #[test]
    fn test_inventory_snippet_fixed_discount_price() {
        let snippet = inventory_snippet(&[product(8, 0, Some(Decimal::new(999, 0)))]);
        assert!(snippet.contains("SalePrice: $999.00"));
    }

    #[test]
    fn test_inventory_snippet_empty_is_generic() {
        assert_eq!(inventory_snippet(&[]), GENERIC_CONTEXT);
    }

    #[test]
    fn test_system_prompt_embeds_inventory() {
        let prompt = system_prompt("PRODUCT_RECORD\nName: X");
        assert!(prompt.contains("INVENTORY CONTEXT:\nPRODUCT_RECORD\nName: X"));
    }

    #[test]
    fn test_visit_intent_requires_both_sides() {
        assert!(is_visit_intent(
            "Can I come visit tomorrow?",
            "Our showroom is open daily."
        ));
        assert!(!is_visit_intent("Can I visit?", "Yes, we ship nationwide."));
        assert!(!is_visit_intent("What is the price?", "See our showroom."));
    }

    #[test]
    fn test_history_roles_are_mapped() {
        let turns: Vec<HistoryTurn> = serde_json::from_str(
            r#"[
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello"}]},
                {"role": "model", "parts": []}
            ]"#,
        )
        .expect("deserialize");
        let messages: Vec<_> = turns.iter().filter_map(HistoryTurn::to_message).collect();
        assert_eq!(
            messages,
            vec![
                ChatMessage::new(Role::User, "hi"),
                ChatMessage::new(Role::Assistant, "hello"),
            ]
        );
    }
}

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use techpro_core::{Intent, OrderId, ProductId};

use crate::llm::LlmService;

const KEYWORD_RULES: [(Intent, &[&str]); 6] = [
    (Intent::OrderStatus, &["order", "track", "ord-"]),
    (Intent::Complaint, &["problem", "issue", "complaint", "broken", "damaged", "not working"]),
    (Intent::Refund, &["refund", "return", "money back"]),
    (Intent::Delivery, &["delivery", "shipping", "deliver", "when will"]),
    (Intent::Comparison, &["compare", "vs", "versus", "difference between"]),
    (Intent::ProductInfo, &["laptop", "phone", "tv", "product", "specs", "features", "price"]),
];

const MAX_CATALOG_PRODUCT_ID: u64 = 100;

fn order_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"ORD-\d{4}").expect("order id pattern is valid"))
}

fn standalone_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d+\b").expect("number pattern is valid"))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("number pattern is valid"))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedEntities {
    pub order_ids: Vec<String>,
    pub numbers: Vec<String>,
}

/// Labels messages with the model when one is available, keyword rules otherwise.
#[derive(Clone)]
pub struct IntentClassifier {
    llm: Arc<LlmService>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, message: &str) -> Intent {
        if !self.llm.is_remote() {
            return keyword_intent(message);
        }

        match self.llm.classify(message).await {
            Ok(answer) => {
                let intent = Intent::from_label(&answer);
                info!(
                    event_name = "agent.intent.classified",
                    intent = %intent,
                    method = "llm",
                    "classified message intent"
                );
                intent
            }
            Err(err) => {
                warn!(
                    event_name = "agent.intent.llm_failed",
                    error = %err,
                    "intent classification failed, using keyword rules"
                );
                keyword_intent(message)
            }
        }
    }
}

/// First matching rule wins; unmatched messages are `General`.
pub fn keyword_intent(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map_or(Intent::General, |(intent, _)| *intent)
}

pub fn extract_order_id(message: &str) -> Option<OrderId> {
    order_id_pattern().find(message).map(|found| OrderId(found.as_str().to_string()))
}

/// Standalone integers that fall inside the catalog id range, in message order.
pub fn extract_product_ids(message: &str) -> Vec<ProductId> {
    standalone_number_pattern()
        .find_iter(message)
        .filter_map(|found| found.as_str().parse::<u64>().ok())
        .filter(|id| (1..=MAX_CATALOG_PRODUCT_ID).contains(id))
        .filter_map(|id| u32::try_from(id).ok())
        .map(ProductId)
        .collect()
}

pub fn extract_entities(message: &str) -> ExtractedEntities {
    ExtractedEntities {
        order_ids: order_id_pattern()
            .find_iter(message)
            .map(|found| found.as_str().to_string())
            .collect(),
        numbers: number_pattern().find_iter(message).map(|found| found.as_str().to_string()).collect(),
    }
}

use serde::{Deserialize, Serialize};

use super::order::OrderId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub location: String,
    pub timestamp: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub order_id: OrderId,
    pub tracking_number: String,
    pub carrier: String,
    pub current_status: String,
    pub estimated_delivery: String,
    #[serde(default)]
    pub tracking_history: Vec<TrackingEvent>,
}

impl Delivery {
    /// One bullet per tracking event, oldest first as stored.
    pub fn tracking_summary(&self) -> String {
        self.tracking_history
            .iter()
            .map(|event| format!("• {}: {} at {}", event.timestamp, event.status, event.location))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

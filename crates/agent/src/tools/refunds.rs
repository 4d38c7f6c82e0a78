use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use techpro_core::{OrderId, Refund};
use techpro_db::DataStore;

use super::orders::OrderInput;
use super::{parse_input, Tool, ToolReply};

pub struct RefundStatusTool {
    store: Arc<DataStore>,
}

impl RefundStatusTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

/// Customer-facing sentence for a refund's status.
pub fn refund_status_message(refund: &Refund) -> String {
    let mut message = match refund.status.as_str() {
        "pending" => "Your refund request is being processed.".to_string(),
        "approved" => "Your refund has been approved and is being processed.".to_string(),
        "processed" => format!("Your refund of ${:.2} has been processed.", refund.amount),
        "completed" => format!("Your refund of ${:.2} has been completed.", refund.amount),
        other => format!("Refund status: {other}"),
    };
    if let Some(expected) = &refund.expected_completion {
        message.push_str(&format!(" Expected completion: {expected}"));
    }
    message
}

#[async_trait]
impl Tool for RefundStatusTool {
    fn name(&self) -> &'static str {
        "refund_status"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let OrderInput { order_id } = parse_input(self.name(), input)?;
        let order_id = OrderId(order_id);

        let Some(refund) = self.store.refund(&order_id).await else {
            if self.store.order(&order_id).await.is_none() {
                return Ok(ToolReply::failure(format!("Order {order_id} not found.")));
            }
            return Ok(ToolReply::ok(format!(
                "No refund request found for order {order_id}. Would you like to initiate a return?"
            ))
            .with("has_refund", false));
        };

        info!(event_name = "tools.refund_status.found", order_id = %order_id, status = %refund.status, "refund found");
        Ok(ToolReply::ok(refund_status_message(&refund))
            .with("has_refund", true)
            .with("refund", refund))
    }
}

#[derive(Debug, Deserialize)]
struct RefundRequest {
    order_id: String,
    reason: String,
}

pub struct InitiateRefundTool {
    store: Arc<DataStore>,
}

impl InitiateRefundTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for InitiateRefundTool {
    fn name(&self) -> &'static str {
        "initiate_refund"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let RefundRequest { order_id, reason } = parse_input(self.name(), input)?;
        let order_id = OrderId(order_id);

        let Some(order) = self.store.order(&order_id).await else {
            return Ok(ToolReply::failure(format!("Order {order_id} not found.")));
        };
        if let Some(existing) = self.store.refund(&order_id).await {
            return Ok(ToolReply::failure(format!(
                "A refund request already exists for order {order_id} (Status: {})",
                existing.status
            )));
        }

        let refund = self.store.create_refund(&order_id, order.total, &reason).await;
        info!(
            event_name = "tools.refund.initiated",
            refund_id = %refund.refund_id.0,
            order_id = %order_id,
            "refund initiated"
        );

        Ok(ToolReply::ok(format!(
            "Refund request {} has been initiated. \
             Your refund of ${:.2} will be processed within 5-7 business days.",
            refund.refund_id.0, refund.amount
        ))
        .with("refund_id", &refund.refund_id)
        .with("refund", refund))
    }
}

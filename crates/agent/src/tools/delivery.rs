use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use techpro_core::OrderId;
use techpro_db::DataStore;

use super::orders::OrderInput;
use super::{parse_input, Tool, ToolReply};

pub const ESTIMATE_PENDING: &str = "Delivery estimate is being calculated. Please check back soon.";

pub struct DeliveryStatusTool {
    store: Arc<DataStore>,
}

impl DeliveryStatusTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeliveryStatusTool {
    fn name(&self) -> &'static str {
        "delivery_status"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let OrderInput { order_id } = parse_input(self.name(), input)?;
        let order_id = OrderId(order_id);

        let Some(delivery) = self.store.delivery(&order_id).await else {
            if self.store.order(&order_id).await.is_none() {
                return Ok(ToolReply::failure(format!("Order {order_id} not found.")));
            }
            return Ok(ToolReply::ok(format!(
                "Delivery information not yet available for order {order_id}."
            )));
        };

        let message = format!(
            "Order {order_id} is currently {}. Estimated delivery: {}. Tracking number: {} ({})",
            delivery.current_status,
            delivery.estimated_delivery,
            delivery.tracking_number,
            delivery.carrier
        );
        info!(
            event_name = "tools.delivery_status.found",
            order_id = %order_id,
            status = %delivery.current_status,
            "delivery found"
        );

        Ok(ToolReply::ok(message)
            .with("tracking_summary", delivery.tracking_summary())
            .with("delivery", delivery))
    }
}

pub struct EstimateDeliveryTool {
    store: Arc<DataStore>,
}

impl EstimateDeliveryTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for EstimateDeliveryTool {
    fn name(&self) -> &'static str {
        "estimate_delivery"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let OrderInput { order_id } = parse_input(self.name(), input)?;
        let order_id = OrderId(order_id);

        let Some(order) = self.store.order(&order_id).await else {
            return Ok(ToolReply::failure(format!("Order {order_id} not found.")));
        };
        match order.expected_delivery {
            Some(date) => Ok(ToolReply::ok(format!("Your order is expected to arrive by {date}."))
                .with("estimated_delivery", date)),
            None => Ok(ToolReply::ok(ESTIMATE_PENDING)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DeliveryStatusTool, EstimateDeliveryTool, ESTIMATE_PENDING};
    use crate::tools::{fixtures, Tool};

    #[tokio::test]
    async fn delivery_status_message_is_one_sentence_with_history_in_data() {
        let tool = DeliveryStatusTool::new(fixtures::store());
        let reply = tool.execute(json!({"order_id": "ORD-1001"})).await.expect("execute");

        assert!(reply.success);
        assert_eq!(
            reply.message,
            "Order ORD-1001 is currently in_transit. Estimated delivery: 2024-01-22. \
             Tracking number: TRK123456789 (FedEx)"
        );
        assert!(!reply.message.contains('\n'));
        let history = reply.data["tracking_summary"].as_str().expect("tracking summary");
        assert!(history.contains("• 2024-01-16 08:00: Shipped at Warehouse - Newark, NJ"));
        assert_eq!(reply.data["delivery"]["carrier"], json!("FedEx"));
    }

    #[tokio::test]
    async fn missing_delivery_depends_on_order_existence() {
        let tool = DeliveryStatusTool::new(fixtures::store());

        let pending = tool.execute(json!({"order_id": "ORD-1003"})).await.expect("execute");
        assert!(pending.success);
        assert_eq!(pending.message, "Delivery information not yet available for order ORD-1003.");

        let unknown = tool.execute(json!({"order_id": "ORD-4040"})).await.expect("execute");
        assert!(!unknown.success);
        assert_eq!(unknown.message, "Order ORD-4040 not found.");
    }

    #[tokio::test]
    async fn estimate_uses_expected_delivery_when_known() {
        let tool = EstimateDeliveryTool::new(fixtures::store());

        let known = tool.execute(json!({"order_id": "ORD-1001"})).await.expect("execute");
        assert_eq!(known.message, "Your order is expected to arrive by 2024-01-22.");

        let pending = tool.execute(json!({"order_id": "ORD-1003"})).await.expect("execute");
        assert_eq!(pending.message, ESTIMATE_PENDING);
    }
}

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use techpro_core::OrderId;
use techpro_db::DataStore;

use super::{parse_input, Tool, ToolReply};

#[derive(Debug, Deserialize)]
pub(crate) struct OrderInput {
    pub order_id: String,
}

pub struct OrderStatusTool {
    store: Arc<DataStore>,
}

impl OrderStatusTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OrderStatusTool {
    fn name(&self) -> &'static str {
        "order_status"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let OrderInput { order_id } = parse_input(self.name(), input)?;
        let Some(order) = self.store.order(&OrderId(order_id.clone())).await else {
            return Ok(ToolReply::failure(format!(
                "Order {order_id} not found. Please check the order ID."
            )));
        };

        let mut message = format!("Order {order_id} is currently {}.", order.status);
        if let Some(expected) = &order.expected_delivery {
            message.push_str(&format!(" Expected delivery: {expected}"));
        }
        info!(event_name = "tools.order_status.found", order_id = %order_id, status = %order.status, "order found");

        let mut reply = ToolReply::ok(message)
            .with("order_id", &order.order_id)
            .with("status", &order.status)
            .with("order_date", &order.order_date)
            .with("total", order.total.to_f64())
            .with("items", &order.items)
            .with("customer_name", &order.customer_name);
        if let Some(expected) = &order.expected_delivery {
            reply = reply.with("expected_delivery", expected);
        }
        if let Some(tracking) = &order.tracking_number {
            reply = reply.with("tracking_number", tracking);
        }
        Ok(reply)
    }
}

#[derive(Debug, Deserialize)]
struct CustomerInput {
    customer_email: String,
}

pub struct CustomerOrdersTool {
    store: Arc<DataStore>,
}

impl CustomerOrdersTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CustomerOrdersTool {
    fn name(&self) -> &'static str {
        "customer_orders"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let CustomerInput { customer_email } = parse_input(self.name(), input)?;
        let orders = self.store.orders_for_customer(&customer_email).await;
        Ok(ToolReply::ok(format!("Found {} order(s) for {customer_email}.", orders.len()))
            .with("count", orders.len())
            .with("orders", orders))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CustomerOrdersTool, OrderStatusTool};
    use crate::tools::{fixtures, Tool};

    #[tokio::test]
    async fn known_order_reports_status_and_expected_delivery() {
        let tool = OrderStatusTool::new(fixtures::store());
        let reply = tool.execute(json!({"order_id": "ORD-1001"})).await.expect("execute");

        assert!(reply.success);
        assert_eq!(reply.message, "Order ORD-1001 is currently shipped. Expected delivery: 2024-01-22");
        assert_eq!(reply.data["tracking_number"], json!("TRK123456789"));
        assert_eq!(reply.data["total"], json!(1349.98));
        assert_eq!(reply.data["items"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn order_without_delivery_date_has_short_message() {
        let tool = OrderStatusTool::new(fixtures::store());
        let reply = tool.execute(json!({"order_id": "ORD-1003"})).await.expect("execute");

        assert_eq!(reply.message, "Order ORD-1003 is currently processing.");
        assert!(!reply.data.contains_key("expected_delivery"));
    }

    #[tokio::test]
    async fn unknown_order_is_a_failure() {
        let tool = OrderStatusTool::new(fixtures::store());
        let reply = tool.execute(json!({"order_id": "ORD-9999"})).await.expect("execute");

        assert!(!reply.success);
        assert_eq!(reply.message, "Order ORD-9999 not found. Please check the order ID.");
    }

    #[tokio::test]
    async fn customer_orders_filters_by_email() {
        let tool = CustomerOrdersTool::new(fixtures::store());
        let reply = tool
            .execute(json!({"customer_email": "alice.johnson@example.com"}))
            .await
            .expect("execute");

        assert_eq!(reply.data["count"], json!(2));
        assert_eq!(reply.data["orders"][1]["order_id"], json!("ORD-1004"));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use techpro_db::DataStore;

pub mod complaints;
pub mod delivery;
pub mod orders;
pub mod refunds;

pub use complaints::{ComplaintStatusTool, CreateComplaintTool, OrderComplaintsTool};
pub use delivery::{DeliveryStatusTool, EstimateDeliveryTool};
pub use orders::{CustomerOrdersTool, OrderStatusTool};
pub use refunds::{InitiateRefundTool, RefundStatusTool};

/// Outcome of a tool call. `message` is customer-facing text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolReply {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: Map::new() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: Map::new() }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        // Values here are plain records; serialization only fails for non-string map keys.
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<ToolReply>;
}

pub(crate) fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input).with_context(|| format!("invalid input for tool `{tool}`"))
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Every customer-service tool backed by `store`.
    pub fn with_store(store: Arc<DataStore>) -> Self {
        let mut registry = Self::default();
        registry.register(OrderStatusTool::new(store.clone()));
        registry.register(CustomerOrdersTool::new(store.clone()));
        registry.register(CreateComplaintTool::new(store.clone()));
        registry.register(ComplaintStatusTool::new(store.clone()));
        registry.register(OrderComplaintsTool::new(store.clone()));
        registry.register(RefundStatusTool::new(store.clone()));
        registry.register(InitiateRefundTool::new(store.clone()));
        registry.register(DeliveryStatusTool::new(store.clone()));
        registry.register(EstimateDeliveryTool::new(store));
        info!(event_name = "agent.tools.registered", tools = registry.len(), "tool registry ready");
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolReply> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        let reply = tool.execute(input).await?;
        debug!(event_name = "agent.tools.executed", tool = name, success = reply.success, "tool executed");
        Ok(reply)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use techpro_db::{DataStore, DemoDataset};

    pub fn store() -> Arc<DataStore> {
        Arc::new(DataStore::from_dataset(DemoDataset::dataset().expect("demo dataset parses")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{fixtures, ToolRegistry, ToolReply};

    #[test]
    fn registry_holds_every_tool() {
        let registry = ToolRegistry::with_store(fixtures::store());
        assert_eq!(
            registry.names(),
            vec![
                "complaint_status",
                "create_complaint",
                "customer_orders",
                "delivery_status",
                "estimate_delivery",
                "initiate_refund",
                "order_complaints",
                "order_status",
                "refund_status",
            ]
        );
        assert!(!registry.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_input_are_errors() {
        let registry = ToolRegistry::with_store(fixtures::store());

        let unknown = registry.execute("cancel_order", json!({})).await.expect_err("unknown tool");
        assert!(unknown.to_string().contains("cancel_order"));

        let invalid =
            registry.execute("order_status", json!({"id": "ORD-1001"})).await.expect_err("bad input");
        assert!(invalid.to_string().contains("order_status"));
    }

    #[test]
    fn reply_data_is_flattened_when_serialized() {
        let reply = ToolReply::ok("done").with("count", 2);
        assert_eq!(
            serde_json::to_value(&reply).expect("serialize"),
            json!({"success": true, "message": "done", "count": 2})
        );
    }
}

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use techpro_core::OrderId;
use techpro_db::DataStore;

use super::orders::OrderInput;
use super::{parse_input, Tool, ToolReply};

#[derive(Debug, Deserialize)]
struct NewComplaint {
    order_id: String,
    issue: String,
    description: String,
}

pub struct CreateComplaintTool {
    store: Arc<DataStore>,
}

impl CreateComplaintTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateComplaintTool {
    fn name(&self) -> &'static str {
        "create_complaint"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let NewComplaint { order_id, issue, description } = parse_input(self.name(), input)?;
        let order_id = OrderId(order_id);
        if self.store.order(&order_id).await.is_none() {
            return Ok(ToolReply::failure(format!(
                "Order {order_id} not found. Cannot create complaint."
            )));
        }

        let complaint = self.store.create_complaint(&order_id, &issue, &description).await;
        info!(
            event_name = "tools.complaint.created",
            complaint_id = %complaint.complaint_id.0,
            order_id = %order_id,
            "complaint created"
        );

        Ok(ToolReply::ok(format!(
            "I'm sorry to hear about the issue with your order. I've created complaint {}. \
             Our support team will contact you within 24 hours to resolve this.",
            complaint.complaint_id.0
        ))
        .with("complaint_id", &complaint.complaint_id)
        .with("status", &complaint.status))
    }
}

#[derive(Debug, Deserialize)]
struct ComplaintLookup {
    complaint_id: String,
}

pub struct ComplaintStatusTool {
    store: Arc<DataStore>,
}

impl ComplaintStatusTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ComplaintStatusTool {
    fn name(&self) -> &'static str {
        "complaint_status"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let ComplaintLookup { complaint_id } = parse_input(self.name(), input)?;
        match self.store.complaint(&complaint_id).await {
            Some(complaint) => Ok(ToolReply::ok(format!(
                "Complaint {complaint_id} is currently {}.",
                complaint.status
            ))
            .with("complaint", complaint)),
            None => Ok(ToolReply::failure(format!("Complaint {complaint_id} not found."))),
        }
    }
}

pub struct OrderComplaintsTool {
    store: Arc<DataStore>,
}

impl OrderComplaintsTool {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OrderComplaintsTool {
    fn name(&self) -> &'static str {
        "order_complaints"
    }

    async fn execute(&self, input: Value) -> Result<ToolReply> {
        let OrderInput { order_id } = parse_input(self.name(), input)?;
        let complaints = self.store.complaints_for_order(&OrderId(order_id.clone())).await;
        Ok(ToolReply::ok(format!(
            "Found {} complaint(s) for order {order_id}.",
            complaints.len()
        ))
        .with("count", complaints.len())
        .with("complaints", complaints))
    }
}

use serde::{Deserialize, Serialize};

use super::order::OrderId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComplaintId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub complaint_id: ComplaintId,
    pub order_id: OrderId,
    pub issue: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

pub const COMPLAINT_STATUS_OPEN: &str = "open";

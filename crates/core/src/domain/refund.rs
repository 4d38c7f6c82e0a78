use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefundId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: RefundId,
    pub order_id: OrderId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    pub requested_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_completion: Option<String>,
}

pub const REFUND_STATUS_PENDING: &str = "pending";

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label assigned to a user message to select a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductInfo,
    OrderStatus,
    Complaint,
    Refund,
    Delivery,
    Comparison,
    General,
    /// Only reported on a response when processing failed.
    Error,
}

impl Intent {
    /// Labels a classifier is allowed to produce.
    pub const ROUTABLE: [Intent; 7] = [
        Intent::ProductInfo,
        Intent::OrderStatus,
        Intent::Complaint,
        Intent::Refund,
        Intent::Delivery,
        Intent::Comparison,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductInfo => "product_info",
            Self::OrderStatus => "order_status",
            Self::Complaint => "complaint",
            Self::Refund => "refund",
            Self::Delivery => "delivery",
            Self::Comparison => "comparison",
            Self::General => "general",
            Self::Error => "error",
        }
    }

    /// Maps a free-form classifier answer onto a routable intent; anything unknown is `General`.
    pub fn from_label(label: &str) -> Self {
        label
            .trim()
            .to_ascii_lowercase()
            .parse::<Intent>()
            .ok()
            .filter(|intent| *intent != Intent::Error)
            .unwrap_or(Intent::General)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownIntent(pub String);

impl fmt::Display for UnknownIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown intent `{}`", self.0)
    }
}

impl std::error::Error for UnknownIntent {}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "product_info" => Ok(Self::ProductInfo),
            "order_status" => Ok(Self::OrderStatus),
            "complaint" => Ok(Self::Complaint),
            "refund" => Ok(Self::Refund),
            "delivery" => Ok(Self::Delivery),
            "comparison" => Ok(Self::Comparison),
            "general" => Ok(Self::General),
            "error" => Ok(Self::Error),
            other => Err(UnknownIntent(other.to_string())),
        }
    }
}

pub mod config;
pub mod domain;
pub mod errors;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use domain::chat::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use domain::complaint::{Complaint, ComplaintId};
pub use domain::delivery::{Delivery, TrackingEvent};
pub use domain::intent::Intent;
pub use domain::order::{Order, OrderId, OrderItem};
pub use domain::product::{Product, ProductId, ProductSpecs};
pub use domain::refund::{Refund, RefundId};
pub use errors::InterfaceError;

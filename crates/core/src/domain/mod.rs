pub mod chat;
pub mod complaint;
pub mod delivery;
pub mod intent;
pub mod order;
pub mod product;
pub mod refund;

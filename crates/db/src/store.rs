use std::path::{Path, PathBuf};

use chrono::{Duration, Local};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use techpro_core::domain::complaint::COMPLAINT_STATUS_OPEN;
use techpro_core::domain::refund::REFUND_STATUS_PENDING;
use techpro_core::{
    Complaint, ComplaintId, Delivery, Order, OrderId, Product, ProductId, Refund, RefundId,
};

pub const PRODUCTS_FILE: &str = "products.json";
pub const ORDERS_FILE: &str = "orders.json";
pub const COMPLAINTS_FILE: &str = "complaints.json";
pub const REFUNDS_FILE: &str = "refunds.json";
pub const DELIVERIES_FILE: &str = "deliveries.json";

/// Complaint and refund ids are allocated after incrementing from this value.
const ID_COUNTER_START: u32 = 100;
const REFUND_COMPLETION_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not prepare data directory `{path}`: {source}")]
    DataDir { path: PathBuf, source: std::io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// All records the store serves, as loaded from disk or fixtures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub complaints: Vec<Complaint>,
    pub refunds: Vec<Refund>,
    pub deliveries: Vec<Delivery>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub products: usize,
    pub orders: usize,
    pub complaints: usize,
    pub refunds: usize,
    pub deliveries: usize,
}

struct StoreState {
    data: Dataset,
    complaint_counter: u32,
    refund_counter: u32,
}

/// In-memory record store seeded from JSON files. Mutations are never written back.
pub struct DataStore {
    dir: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl DataStore {
    pub fn from_dataset(data: Dataset) -> Self {
        Self {
            dir: None,
            state: RwLock::new(StoreState {
                data,
                complaint_counter: ID_COUNTER_START,
                refund_counter: ID_COUNTER_START,
            }),
        }
    }

    /// Loads every record file under `dir`, creating the directory when needed.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::DataDir { path: dir.clone(), source })?;

        let data = Dataset {
            products: load_records(&dir, PRODUCTS_FILE).await,
            orders: load_records(&dir, ORDERS_FILE).await,
            complaints: load_records(&dir, COMPLAINTS_FILE).await,
            refunds: load_records(&dir, REFUNDS_FILE).await,
            deliveries: load_records(&dir, DELIVERIES_FILE).await,
        };

        info!(
            event_name = "store.load.completed",
            data_dir = %dir.display(),
            products = data.products.len(),
            orders = data.orders.len(),
            complaints = data.complaints.len(),
            refunds = data.refunds.len(),
            deliveries = data.deliveries.len(),
            "data store loaded"
        );

        let mut store = Self::from_dataset(data);
        store.dir = Some(dir);
        Ok(store)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.data.products.clone()
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        let state = self.state.read().await;
        state.data.products.iter().find(|product| product.id == id).cloned()
    }

    /// Filters by exact category and inclusive price bounds; every filter is optional.
    pub async fn search_products(
        &self,
        category: Option<&str>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
    ) -> Vec<Product> {
        let state = self.state.read().await;
        state
            .data
            .products
            .iter()
            .filter(|product| category.map_or(true, |category| product.category == category))
            .filter(|product| min_price.map_or(true, |min| product.price >= min))
            .filter(|product| max_price.map_or(true, |max| product.price <= max))
            .cloned()
            .collect()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.data.orders.clone()
    }

    pub async fn order(&self, order_id: &OrderId) -> Option<Order> {
        let state = self.state.read().await;
        state.data.orders.iter().find(|order| &order.order_id == order_id).cloned()
    }

    pub async fn orders_for_customer(&self, customer_email: &str) -> Vec<Order> {
        let state = self.state.read().await;
        state
            .data
            .orders
            .iter()
            .filter(|order| order.customer_email.eq_ignore_ascii_case(customer_email.trim()))
            .cloned()
            .collect()
    }

    pub async fn complaints(&self) -> Vec<Complaint> {
        self.state.read().await.data.complaints.clone()
    }

    pub async fn complaint(&self, complaint_id: &str) -> Option<Complaint> {
        let state = self.state.read().await;
        state
            .data
            .complaints
            .iter()
            .find(|complaint| complaint.complaint_id.0 == complaint_id)
            .cloned()
    }

    pub async fn complaints_for_order(&self, order_id: &OrderId) -> Vec<Complaint> {
        let state = self.state.read().await;
        state
            .data
            .complaints
            .iter()
            .filter(|complaint| &complaint.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn create_complaint(
        &self,
        order_id: &OrderId,
        issue: &str,
        description: &str,
    ) -> Complaint {
        let mut state = self.state.write().await;
        state.complaint_counter += 1;

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let complaint = Complaint {
            complaint_id: ComplaintId(format!("CMP-{}", state.complaint_counter)),
            order_id: order_id.clone(),
            issue: issue.to_string(),
            description: description.to_string(),
            status: COMPLAINT_STATUS_OPEN.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        state.data.complaints.push(complaint.clone());
        complaint
    }

    pub async fn refunds(&self) -> Vec<Refund> {
        self.state.read().await.data.refunds.clone()
    }

    /// First refund recorded against the order, if any.
    pub async fn refund(&self, order_id: &OrderId) -> Option<Refund> {
        let state = self.state.read().await;
        state.data.refunds.iter().find(|refund| &refund.order_id == order_id).cloned()
    }

    pub async fn create_refund(&self, order_id: &OrderId, amount: Decimal, reason: &str) -> Refund {
        let mut state = self.state.write().await;
        state.refund_counter += 1;

        let today = Local::now().date_naive();
        let expected = today + Duration::days(REFUND_COMPLETION_DAYS);
        let refund = Refund {
            refund_id: RefundId(format!("REF-{}", state.refund_counter)),
            order_id: order_id.clone(),
            amount,
            status: REFUND_STATUS_PENDING.to_string(),
            reason: reason.to_string(),
            requested_date: today.format("%Y-%m-%d").to_string(),
            processed_date: None,
            expected_completion: Some(expected.format("%Y-%m-%d").to_string()),
        };
        state.data.refunds.push(refund.clone());
        refund
    }

    pub async fn delivery(&self, order_id: &OrderId) -> Option<Delivery> {
        let state = self.state.read().await;
        state.data.deliveries.iter().find(|delivery| &delivery.order_id == order_id).cloned()
    }

    pub async fn counts(&self) -> StoreCounts {
        let state = self.state.read().await;
        StoreCounts {
            products: state.data.products.len(),
            orders: state.data.orders.len(),
            complaints: state.data.complaints.len(),
            refunds: state.data.refunds.len(),
            deliveries: state.data.deliveries.len(),
        }
    }
}

async fn load_records<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Vec<T> {
    let path = dir.join(file_name);
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                event_name = "store.load.missing_file",
                file = file_name,
                "record file not found, using an empty list"
            );
            return Vec::new();
        }
        Err(err) => {
            error!(
                event_name = "store.load.read_failed",
                file = file_name,
                error = %err,
                "could not read record file, using an empty list"
            );
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(records) => records,
        Err(err) => {
            error!(
                event_name = "store.load.parse_failed",
                file = file_name,
                error = %err,
                "could not parse record file, using an empty list"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration, Local, NaiveDate};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use techpro_core::{OrderId, ProductId};

    use super::DataStore;
    use crate::fixtures::DemoDataset;

    fn demo_store() -> DataStore {
        DataStore::from_dataset(DemoDataset::dataset().expect("demo dataset parses"))
    }

    #[tokio::test]
    async fn complaint_ids_start_after_one_hundred() {
        let store = demo_store();
        let order_id = OrderId::from("ORD-1001");

        let first = store.create_complaint(&order_id, "Product issue", "screen flickers").await;
        let second = store.create_complaint(&order_id, "Product issue", "still flickers").await;

        assert_eq!(first.complaint_id.0, "CMP-101");
        assert_eq!(second.complaint_id.0, "CMP-102");
        assert_eq!(first.status, "open");
        assert_eq!(first.created_at, first.updated_at);
        assert!(store.complaints_for_order(&order_id).await.len() >= 2);
    }

    #[tokio::test]
    async fn refund_is_pending_with_completion_a_week_out() {
        let store = demo_store();
        let order_id = OrderId::from("ORD-1003");

        let amount = Decimal::from_str("89.99").expect("decimal literal");
        let refund = store.create_refund(&order_id, amount, "Customer request").await;

        assert_eq!(refund.refund_id.0, "REF-101");
        assert_eq!(refund.status, "pending");
        let requested =
            NaiveDate::parse_from_str(&refund.requested_date, "%Y-%m-%d").expect("requested date");
        assert_eq!(requested, Local::now().date_naive());
        let expected = NaiveDate::parse_from_str(
            refund.expected_completion.as_deref().expect("expected completion"),
            "%Y-%m-%d",
        )
        .expect("completion date");
        assert_eq!(expected - requested, Duration::days(7));
    }

    #[tokio::test]
    async fn search_filters_by_category_and_inclusive_price_bounds() {
        let store = demo_store();
        let laptops = store.search_products(Some("Laptops"), None, None).await;
        assert!(!laptops.is_empty());
        assert!(laptops.iter().all(|product| product.category == "Laptops"));

        let cheapest = laptops.iter().map(|product| product.price).min().expect("a laptop");
        let bounded = store.search_products(Some("Laptops"), Some(cheapest), Some(cheapest)).await;
        assert!(bounded.iter().all(|product| product.price == cheapest));
        assert!(!bounded.is_empty());

        assert!(store.search_products(Some("Furniture"), None, None).await.is_empty());
    }

    #[tokio::test]
    async fn lookups_return_none_for_unknown_ids() {
        let store = demo_store();
        assert!(store.order(&OrderId::from("ORD-9999")).await.is_none());
        assert!(store.product(ProductId(999)).await.is_none());
        assert!(store.delivery(&OrderId::from("ORD-9999")).await.is_none());
        assert!(store.complaint("CMP-999").await.is_none());
    }

    #[tokio::test]
    async fn load_tolerates_missing_and_malformed_files() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("orders.json"), "{ not json").expect("write orders");
        std::fs::write(
            dir.path().join("deliveries.json"),
            r#"[{"order_id":"ORD-1","tracking_number":"TP1","carrier":"UPS","current_status":"in_transit","estimated_delivery":"2024-02-01"}]"#,
        )
        .expect("write deliveries");

        let store = DataStore::load(dir.path()).await.expect("load store");
        let counts = store.counts().await;

        assert_eq!(counts.products, 0);
        assert_eq!(counts.orders, 0);
        assert_eq!(counts.deliveries, 1);
        assert_eq!(store.data_dir(), Some(dir.path()));
    }
}

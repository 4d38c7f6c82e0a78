use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::store::{
    Dataset, StoreError, COMPLAINTS_FILE, DELIVERIES_FILE, ORDERS_FILE, PRODUCTS_FILE,
    REFUNDS_FILE,
};

pub const PRODUCT_MANUALS_FILE: &str = "product_manuals.json";
pub const FAQS_FILE: &str = "faqs.json";
pub const POLICIES_FILE: &str = "policies.json";

/// Demo catalog, orders and support documents for TechPro Electronics.
///
/// The same files live under `data/` at the repository root so a fresh checkout
/// runs without seeding; `write_missing` recreates them anywhere else.
pub struct DemoDataset;

impl DemoDataset {
    pub const PRODUCTS: &'static str = include_str!("../../../data/products.json");
    pub const ORDERS: &'static str = include_str!("../../../data/orders.json");
    pub const COMPLAINTS: &'static str = include_str!("../../../data/complaints.json");
    pub const REFUNDS: &'static str = include_str!("../../../data/refunds.json");
    pub const DELIVERIES: &'static str = include_str!("../../../data/deliveries.json");

    pub const PRODUCT_MANUALS: &'static str =
        include_str!("../../../data/documents/product_manuals.json");
    pub const FAQS: &'static str = include_str!("../../../data/documents/faqs.json");
    pub const POLICIES: &'static str = include_str!("../../../data/documents/policies.json");

    pub fn dataset() -> Result<Dataset, serde_json::Error> {
        Ok(Dataset {
            products: serde_json::from_str(Self::PRODUCTS)?,
            orders: serde_json::from_str(Self::ORDERS)?,
            complaints: serde_json::from_str(Self::COMPLAINTS)?,
            refunds: serde_json::from_str(Self::REFUNDS)?,
            deliveries: serde_json::from_str(Self::DELIVERIES)?,
        })
    }

    fn record_files() -> [(&'static str, &'static str); 5] {
        [
            (PRODUCTS_FILE, Self::PRODUCTS),
            (ORDERS_FILE, Self::ORDERS),
            (COMPLAINTS_FILE, Self::COMPLAINTS),
            (REFUNDS_FILE, Self::REFUNDS),
            (DELIVERIES_FILE, Self::DELIVERIES),
        ]
    }

    fn document_files() -> [(&'static str, &'static str); 3] {
        [
            (PRODUCT_MANUALS_FILE, Self::PRODUCT_MANUALS),
            (FAQS_FILE, Self::FAQS),
            (POLICIES_FILE, Self::POLICIES),
        ]
    }

    /// Writes every fixture file that does not exist yet; existing files are left untouched.
    pub async fn write_missing(
        data_dir: &Path,
        documents_dir: &Path,
    ) -> Result<FixtureReport, StoreError> {
        let mut report = FixtureReport::default();

        for (dir, files) in [
            (data_dir, Self::record_files().to_vec()),
            (documents_dir, Self::document_files().to_vec()),
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::DataDir { path: dir.to_path_buf(), source })?;

            for (name, contents) in files {
                let path = dir.join(name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    report.skipped.push(path);
                    continue;
                }
                tokio::fs::write(&path, contents)
                    .await
                    .map_err(|source| StoreError::Write { path: path.clone(), source })?;
                report.written.push(path);
            }
        }

        Ok(report)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FixtureReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::DemoDataset;

    #[test]
    fn demo_dataset_parses_into_records() {
        let dataset = DemoDataset::dataset().expect("demo dataset");
        assert!(dataset.products.len() >= 10);
        assert!(dataset.orders.iter().any(|order| order.order_id.0 == "ORD-1001"));
        assert!(dataset.products.iter().all(|product| (1..=100).contains(&product.id.0)));
    }

    #[tokio::test]
    async fn write_missing_keeps_existing_files() {
        let dir = TempDir::new().expect("tempdir");
        let data_dir = dir.path().join("data");
        let documents_dir = data_dir.join("documents");
        std::fs::create_dir_all(&data_dir).expect("data dir");
        std::fs::write(data_dir.join("orders.json"), "[]").expect("existing orders");

        let report = DemoDataset::write_missing(&data_dir, &documents_dir).await.expect("seed");

        assert_eq!(report.written.len(), 7);
        assert_eq!(report.skipped, vec![data_dir.join("orders.json")]);
        let orders = std::fs::read_to_string(data_dir.join("orders.json")).expect("orders");
        assert_eq!(orders, "[]");
        assert!(documents_dir.join("faqs.json").exists());
    }
}

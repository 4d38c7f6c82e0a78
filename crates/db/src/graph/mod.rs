use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use techpro_core::{Product, ProductId};

pub mod catalog;
pub mod neo4j;

pub use catalog::CatalogGraph;
pub use neo4j::Neo4jGraph;

pub const LAPTOP_CATEGORY: &str = "Laptops";
pub const ACCESSORY_CATEGORIES: [&str; 2] = ["Accessories", "Peripherals"];
pub const USB_C: &str = "USB-C";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("graph server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("cypher error {code}: {message}")]
    Cypher { code: String, message: String },
    #[error("unexpected graph response: {0}")]
    Decode(String),
}

/// One feature compared across products; values are keyed by product name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub feature: String,
    pub values: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductComparison {
    pub products: Vec<Product>,
    pub comparison: Vec<ComparisonRow>,
    pub recommendation: String,
}

impl ProductComparison {
    pub fn not_found() -> Self {
        Self {
            products: Vec::new(),
            comparison: Vec::new(),
            recommendation: "Products not found.".to_string(),
        }
    }

    pub fn product_names(&self) -> Vec<&str> {
        self.products.iter().map(|product| product.name.as_str()).collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphSeedSummary {
    pub products: usize,
    pub specs: usize,
    pub same_category_pairs: usize,
    pub compatible_pairs: usize,
}

/// Product relationship queries backed by a graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn has_data(&self) -> Result<bool, GraphError>;
    async fn seed(&self, products: &[Product]) -> Result<GraphSeedSummary, GraphError>;
    async fn compare_products(&self, ids: &[ProductId]) -> Result<ProductComparison, GraphError>;
    async fn find_compatible_products(&self, id: ProductId) -> Result<Vec<Product>, GraphError>;
}

/// Routes queries to the primary graph and falls back to the catalog when it fails.
pub struct GraphService {
    primary: Option<Arc<dyn GraphStore>>,
    fallback: CatalogGraph,
}

impl GraphService {
    pub fn new(primary: Option<Arc<dyn GraphStore>>, fallback: CatalogGraph) -> Self {
        Self { primary, fallback }
    }

    pub fn backend_name(&self) -> &'static str {
        self.primary.as_ref().map_or(self.fallback.name(), |primary| primary.name())
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn compare_products(&self, ids: &[ProductId]) -> ProductComparison {
        if let Some(primary) = &self.primary {
            match primary.compare_products(ids).await {
                Ok(comparison) => return comparison,
                Err(err) => warn!(
                    event_name = "graph.compare.fallback",
                    backend = primary.name(),
                    error = %err,
                    "graph comparison failed, using catalog comparison"
                ),
            }
        }

        self.fallback.compare(ids).await
    }

    pub async fn find_compatible_products(&self, id: ProductId) -> Vec<Product> {
        if let Some(primary) = &self.primary {
            match primary.find_compatible_products(id).await {
                Ok(products) => return products,
                Err(err) => warn!(
                    event_name = "graph.compatible.fallback",
                    backend = primary.name(),
                    error = %err,
                    "compatibility lookup failed, using catalog rules"
                ),
            }
        }

        self.fallback.compatible_with(id).await
    }
}

/// Builds the comparison table for products paired with their rendered specs.
///
/// Spec rows come first, ordered by key, followed by price, rating and warranty.
pub fn build_comparison(entries: Vec<(Product, BTreeMap<String, String>)>) -> ProductComparison {
    if entries.is_empty() {
        return ProductComparison::not_found();
    }

    let spec_keys: BTreeSet<&String> = entries.iter().flat_map(|(_, specs)| specs.keys()).collect();

    let mut comparison = Vec::with_capacity(spec_keys.len() + 3);
    for key in spec_keys {
        let values = entries
            .iter()
            .map(|(product, specs)| {
                let value = specs.get(key).map_or(NOT_AVAILABLE, String::as_str);
                (product.name.clone(), Value::String(value.to_string()))
            })
            .collect();
        comparison.push(ComparisonRow { feature: key.clone(), values });
    }

    let basic_fields: [(&str, fn(&Product) -> Value); 3] = [
        ("price", |product| Value::from(product.price.to_f64())),
        ("rating", |product| Value::from(product.rating)),
        ("warranty", |product| {
            if product.warranty.is_empty() {
                Value::String(NOT_AVAILABLE.to_string())
            } else {
                Value::String(product.warranty.clone())
            }
        }),
    ];
    for (feature, extract) in basic_fields {
        let values =
            entries.iter().map(|(product, _)| (product.name.clone(), extract(product))).collect();
        comparison.push(ComparisonRow { feature: feature.to_string(), values });
    }

    let products: Vec<Product> = entries.into_iter().map(|(product, _)| product).collect();
    let recommendation = recommendation(&products);

    ProductComparison { products, comparison, recommendation }
}

/// Highest-rated product wins; the earliest one is kept on ties.
pub fn recommendation(products: &[Product]) -> String {
    match products {
        [] => String::new(),
        [only] => format!("{} is a great choice!", only.name),
        [first, rest @ ..] => {
            let best = rest
                .iter()
                .fold(first, |best, product| if product.rating > best.rating { product } else { best });
            format!(
                "Based on ratings and features, {} (rated {:.1}/5) appears to be the best option.",
                best.name, best.rating
            )
        }
    }
}

/// Every unordered pair of products sharing a category, in catalog order.
pub fn same_category_pairs(products: &[Product]) -> Vec<(ProductId, ProductId)> {
    let mut by_category: BTreeMap<&str, Vec<ProductId>> = BTreeMap::new();
    for product in products {
        by_category.entry(product.category.as_str()).or_default().push(product.id);
    }

    let mut pairs = Vec::new();
    for ids in by_category.values() {
        for (index, first) in ids.iter().enumerate() {
            for second in &ids[index + 1..] {
                pairs.push((*first, *second));
            }
        }
    }
    pairs
}

/// Laptops with a USB-C port are compatible with accessories whose name mentions USB-C.
pub fn compatibility_pairs(products: &[Product]) -> Vec<(ProductId, ProductId)> {
    let accessories: Vec<&Product> = products
        .iter()
        .filter(|product| ACCESSORY_CATEGORIES.contains(&product.category.as_str()))
        .filter(|product| product.name.contains(USB_C))
        .collect();

    products
        .iter()
        .filter(|product| product.category == LAPTOP_CATEGORY && product.specs.has_port(USB_C))
        .flat_map(|laptop| accessories.iter().map(move |accessory| (laptop.id, accessory.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use techpro_core::{Product, ProductId};

    use super::{build_comparison, compatibility_pairs, recommendation, same_category_pairs};

    fn product(id: u32, name: &str, category: &str, rating: f64, specs: Value) -> Product {
        let warranty = if id % 2 == 0 { "2 years" } else { "" };
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "category": category,
            "price": 100.0 + f64::from(id),
            "rating": rating,
            "warranty": warranty,
            "specs": specs,
        }))
        .expect("product fixture")
    }

    #[test]
    fn comparison_rows_are_sorted_spec_keys_then_basic_fields() {
        let alpha = product(1, "Alpha", "Laptops", 4.2, json!({"ram": "16GB", "battery": "10h"}));
        let beta = product(2, "Beta", "Laptops", 4.7, json!({"ram": "32GB", "storage": "1TB"}));

        let entries = vec![
            (alpha.clone(), alpha.specs.entries()),
            (beta.clone(), beta.specs.entries()),
        ];
        let comparison = build_comparison(entries);

        let features: Vec<&str> =
            comparison.comparison.iter().map(|row| row.feature.as_str()).collect();
        assert_eq!(features, vec!["battery", "ram", "storage", "price", "rating", "warranty"]);

        let battery = &comparison.comparison[0];
        assert_eq!(battery.values.get("Alpha"), Some(&json!("10h")));
        assert_eq!(battery.values.get("Beta"), Some(&json!("N/A")));

        let warranty = &comparison.comparison[5];
        assert_eq!(warranty.values.get("Alpha"), Some(&json!("N/A")));
        assert_eq!(warranty.values.get("Beta"), Some(&json!("2 years")));

        assert_eq!(
            comparison.recommendation,
            "Based on ratings and features, Beta (rated 4.7/5) appears to be the best option."
        );
    }

    #[test]
    fn empty_comparison_reports_products_not_found() {
        let comparison = build_comparison(Vec::new());
        assert!(comparison.products.is_empty());
        assert!(comparison.comparison.is_empty());
        assert_eq!(comparison.recommendation, "Products not found.");
    }

    #[test]
    fn recommendation_handles_single_and_tied_products() {
        let only = product(3, "Solo", "Phones", 4.0, json!({}));
        assert_eq!(recommendation(&[only.clone()]), "Solo is a great choice!");
        assert_eq!(recommendation(&[]), "");

        let tie = product(4, "Twin", "Phones", 4.0, json!({}));
        assert!(recommendation(&[only, tie]).contains("Solo (rated 4.0/5)"));
    }

    #[test]
    fn category_and_compatibility_pairs_follow_catalog_rules() {
        let catalog = vec![
            product(1, "Ultra 13", "Laptops", 4.5, json!({"ports": ["USB-C", "HDMI"]})),
            product(2, "Budget 15", "Laptops", 3.9, json!({"ports": ["USB-A"]})),
            product(3, "USB-C Hub", "Accessories", 4.1, json!({})),
            product(4, "Wireless Mouse", "Peripherals", 4.3, json!({})),
            product(5, "USB-C Dock", "Peripherals", 4.6, json!({})),
        ];

        let same = same_category_pairs(&catalog);
        assert!(same.contains(&(ProductId(1), ProductId(2))));
        assert!(same.contains(&(ProductId(4), ProductId(5))));
        assert_eq!(same.len(), 2);

        let compatible = compatibility_pairs(&catalog);
        assert_eq!(compatible, vec![(ProductId(1), ProductId(3)), (ProductId(1), ProductId(5))]);
    }
}

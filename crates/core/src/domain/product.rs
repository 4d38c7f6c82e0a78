use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specs: ProductSpecs,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub warranty: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews_count: u32,
    #[serde(default)]
    pub brand: String,
}

fn default_in_stock() -> bool {
    true
}

/// Known specification fields plus any extra keys a catalog file carries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl ProductSpecs {
    /// Populated specification entries rendered as text, keyed by field name.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        let scalar_fields = [
            ("processor", &self.processor),
            ("ram", &self.ram),
            ("storage", &self.storage),
            ("display", &self.display),
            ("battery", &self.battery),
            ("camera", &self.camera),
            ("screen_size", &self.screen_size),
            ("resolution", &self.resolution),
            ("refresh_rate", &self.refresh_rate),
            ("os", &self.os),
        ];
        for (key, value) in scalar_fields {
            if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
                entries.insert(key.to_string(), value.to_string());
            }
        }

        for (key, values) in [("connectivity", &self.connectivity), ("ports", &self.ports)] {
            if let Some(values) = values.as_ref().filter(|values| !values.is_empty()) {
                entries.insert(key.to_string(), values.join(", "));
            }
        }

        for (key, value) in &self.other {
            let rendered = match value {
                Value::Null => continue,
                Value::String(text) if text.trim().is_empty() => continue,
                Value::String(text) => text.clone(),
                Value::Array(items) if items.is_empty() => continue,
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(ToString::to_string).unwrap_or_else(|| item.to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            entries.insert(key.clone(), rendered);
        }

        entries
    }

    pub fn has_port(&self, port: &str) -> bool {
        self.ports.as_ref().is_some_and(|ports| ports.iter().any(|candidate| candidate == port))
    }
}

#[cfg(test)]
mod tests {
    use super::{Product, ProductId};

    #[test]
    fn product_parses_catalog_json_with_float_price_and_extra_specs() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "ProBook 14",
            "category": "Laptops",
            "price": 1299.99,
            "specs": {
                "processor": "Intel Core i7",
                "ports": ["USB-C", "HDMI"],
                "weight": "1.4 kg"
            },
            "rating": 4.6,
            "brand": "TechPro"
        }))
        .expect("product should parse");

        assert_eq!(product.id, ProductId(7));
        assert_eq!(product.price.to_string(), "1299.99");
        assert!(product.in_stock, "in_stock defaults to true");
        assert!(product.specs.has_port("USB-C"));

        let entries = product.specs.entries();
        assert_eq!(entries.get("processor").map(String::as_str), Some("Intel Core i7"));
        assert_eq!(entries.get("ports").map(String::as_str), Some("USB-C, HDMI"));
        assert_eq!(entries.get("weight").map(String::as_str), Some("1.4 kg"));
        assert!(!entries.contains_key("ram"));
    }
}

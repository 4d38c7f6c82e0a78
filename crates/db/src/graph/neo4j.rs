use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use techpro_core::config::GraphConfig;
use techpro_core::{Product, ProductId};

use super::{
    build_comparison, compatibility_pairs, same_category_pairs, GraphError, GraphSeedSummary,
    GraphStore, ProductComparison,
};

const COUNT_PRODUCTS: &str = "MATCH (p:Product) RETURN count(p) AS count";
const CLEAR_GRAPH: &str = "MATCH (n) DETACH DELETE n";
const CREATE_PRODUCTS: &str = "UNWIND $products AS product \
     CREATE (p:Product {id: product.id, name: product.name, category: product.category, \
     brand: product.brand, price: product.price, description: product.description, \
     in_stock: product.in_stock, warranty: product.warranty, rating: product.rating, \
     payload: product.payload})";
const CREATE_SPECS: &str = "UNWIND $specs AS spec \
     MATCH (p:Product {id: spec.product_id}) \
     CREATE (s:Spec {key: spec.key, value: spec.value}) \
     CREATE (p)-[:HAS_SPEC]->(s)";
const CREATE_SAME_CATEGORY: &str = "UNWIND $pairs AS pair \
     MATCH (a:Product {id: pair[0]}) MATCH (b:Product {id: pair[1]}) \
     CREATE (a)-[:SAME_CATEGORY]->(b) CREATE (b)-[:SAME_CATEGORY]->(a)";
const CREATE_COMPATIBLE: &str = "UNWIND $pairs AS pair \
     MATCH (a:Product {id: pair[0]}) MATCH (b:Product {id: pair[1]}) \
     CREATE (a)-[:COMPATIBLE_WITH]->(b)";
const COMPARE_PRODUCTS: &str = "MATCH (p:Product) WHERE p.id IN $product_ids \
     OPTIONAL MATCH (p)-[:HAS_SPEC]->(s:Spec) \
     RETURN p.payload AS payload, collect({key: s.key, value: s.value}) AS specs \
     ORDER BY p.id";
const FIND_COMPATIBLE: &str = "MATCH (:Product {id: $product_id})-[:COMPATIBLE_WITH]->(p:Product) \
     RETURN p.payload AS payload ORDER BY p.id";

/// Neo4j reached through its HTTP transactional Cypher endpoint.
pub struct Neo4jGraph {
    client: Client,
    endpoint: String,
    user: String,
    password: SecretString,
}

#[derive(Debug, Serialize)]
pub(crate) struct Statement {
    statement: &'static str,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: &'a [Statement],
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jGraph {
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database.trim()
        );

        Ok(Self {
            client,
            endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn run(&self, statements: &[Statement]) -> Result<Vec<TxResult>, GraphError> {
        debug!(
            event_name = "graph.neo4j.request",
            endpoint = %self.endpoint,
            statements = statements.len(),
            "sending cypher statements"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(self.password.expose_secret()))
            .json(&TxRequest { statements })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Http { status: status.as_u16(), body });
        }

        let payload: TxResponse = response.json().await?;
        decode_response(payload)
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    async fn has_data(&self) -> Result<bool, GraphError> {
        let results =
            self.run(&[Statement { statement: COUNT_PRODUCTS, parameters: json!({}) }]).await?;
        let count = results
            .first()
            .and_then(|result| result.data.first())
            .and_then(|row| row.row.first())
            .and_then(Value::as_u64)
            .ok_or_else(|| GraphError::Decode("count query returned no rows".to_string()))?;
        Ok(count > 0)
    }

    async fn seed(&self, products: &[Product]) -> Result<GraphSeedSummary, GraphError> {
        let (statements, summary) = seed_statements(products)?;
        self.run(&statements).await?;

        info!(
            event_name = "graph.neo4j.seeded",
            products = summary.products,
            specs = summary.specs,
            same_category_pairs = summary.same_category_pairs,
            compatible_pairs = summary.compatible_pairs,
            "seeded product graph"
        );
        Ok(summary)
    }

    async fn compare_products(&self, ids: &[ProductId]) -> Result<ProductComparison, GraphError> {
        let product_ids: Vec<u32> = ids.iter().map(|id| id.0).collect();
        let results = self
            .run(&[Statement {
                statement: COMPARE_PRODUCTS,
                parameters: json!({ "product_ids": product_ids }),
            }])
            .await?;

        let rows = results.into_iter().next().map(|result| result.data).unwrap_or_default();
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columns = row.row.into_iter();
            let product = decode_payload(columns.next())?;
            let specs = decode_specs(columns.next());
            entries.push((product, specs));
        }

        Ok(build_comparison(entries))
    }

    async fn find_compatible_products(&self, id: ProductId) -> Result<Vec<Product>, GraphError> {
        let results = self
            .run(&[Statement {
                statement: FIND_COMPATIBLE,
                parameters: json!({ "product_id": id.0 }),
            }])
            .await?;

        results
            .into_iter()
            .next()
            .map(|result| result.data)
            .unwrap_or_default()
            .into_iter()
            .map(|row| decode_payload(row.row.into_iter().next()))
            .collect()
    }
}

/// Statements that replace the whole graph with the given catalog, run in one transaction.
pub(crate) fn seed_statements(
    products: &[Product],
) -> Result<(Vec<Statement>, GraphSeedSummary), GraphError> {
    let mut nodes = Vec::with_capacity(products.len());
    let mut specs = Vec::new();
    for product in products {
        let payload = serde_json::to_string(product)
            .map_err(|err| GraphError::Decode(format!("product {} payload: {err}", product.id)))?;
        nodes.push(json!({
            "id": product.id.0,
            "name": product.name,
            "category": product.category,
            "brand": product.brand,
            "price": product.price.to_f64(),
            "description": product.description,
            "in_stock": product.in_stock,
            "warranty": product.warranty,
            "rating": product.rating,
            "payload": payload,
        }));
        for (key, value) in product.specs.entries() {
            specs.push(json!({ "product_id": product.id.0, "key": key, "value": value }));
        }
    }

    let same_category: Vec<[u32; 2]> =
        same_category_pairs(products).into_iter().map(|(a, b)| [a.0, b.0]).collect();
    let compatible: Vec<[u32; 2]> =
        compatibility_pairs(products).into_iter().map(|(a, b)| [a.0, b.0]).collect();

    let summary = GraphSeedSummary {
        products: nodes.len(),
        specs: specs.len(),
        same_category_pairs: same_category.len(),
        compatible_pairs: compatible.len(),
    };

    let statements = vec![
        Statement { statement: CLEAR_GRAPH, parameters: json!({}) },
        Statement { statement: CREATE_PRODUCTS, parameters: json!({ "products": nodes }) },
        Statement { statement: CREATE_SPECS, parameters: json!({ "specs": specs }) },
        Statement { statement: CREATE_SAME_CATEGORY, parameters: json!({ "pairs": same_category }) },
        Statement { statement: CREATE_COMPATIBLE, parameters: json!({ "pairs": compatible }) },
    ];

    Ok((statements, summary))
}

pub(crate) fn decode_response(payload: TxResponse) -> Result<Vec<TxResult>, GraphError> {
    if let Some(error) = payload.errors.into_iter().next() {
        return Err(GraphError::Cypher { code: error.code, message: error.message });
    }
    Ok(payload.results)
}

fn decode_payload(column: Option<Value>) -> Result<Product, GraphError> {
    let raw = column
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| GraphError::Decode("product node has no payload".to_string()))?;
    serde_json::from_str(raw).map_err(|err| GraphError::Decode(format!("product payload: {err}")))
}

/// Null keys come from products without any spec node.
fn decode_specs(column: Option<Value>) -> BTreeMap<String, String> {
    let Some(Value::Array(items)) = column else {
        return BTreeMap::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let key = item.get("key")?.as_str()?.to_string();
            let value = match item.get("value")? {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            Some((key, value))
        })
        .collect()
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

/// Document source files and the `doc_type` their entries are tagged with.
pub const DOCUMENT_SOURCES: [(&str, &str); 3] = [
    ("product_manuals", "product_manuals.json"),
    ("faqs", "faqs.json"),
    ("policies", "policies.json"),
];

/// One corpus entry: either free `content` or a `question`/`answer` pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Text that gets chunked and embedded.
    pub fn text(&self) -> String {
        if let Some(content) = &self.content {
            return content.clone();
        }
        if let Some(answer) = &self.answer {
            return format!("Q: {}\nA: {}", self.question.as_deref().unwrap_or_default(), answer);
        }
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().or(self.question.as_deref()).unwrap_or("Untitled")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceDocument {
    pub doc_type: String,
    pub document: Document,
}

/// Reads every known document file under `dir`; missing or malformed files are skipped.
pub async fn load_documents(dir: &Path) -> Vec<SourceDocument> {
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        warn!(
            event_name = "rag.documents.dir_unavailable",
            documents_dir = %dir.display(),
            error = %err,
            "could not create documents directory"
        );
    }

    let mut documents = Vec::new();
    for (doc_type, file_name) in DOCUMENT_SOURCES {
        let path = dir.join(file_name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    event_name = "rag.documents.missing_file",
                    path = %path.display(),
                    "document file not found"
                );
                continue;
            }
            Err(err) => {
                error!(
                    event_name = "rag.documents.read_failed",
                    path = %path.display(),
                    error = %err,
                    "could not read document file"
                );
                continue;
            }
        };

        match serde_json::from_str::<Vec<Document>>(&raw) {
            Ok(items) => {
                info!(
                    event_name = "rag.documents.loaded",
                    file = file_name,
                    count = items.len(),
                    "loaded documents"
                );
                documents.extend(
                    items
                        .into_iter()
                        .map(|document| SourceDocument { doc_type: doc_type.to_string(), document }),
                );
            }
            Err(err) => error!(
                event_name = "rag.documents.parse_failed",
                file = file_name,
                error = %err,
                "could not parse document file"
            ),
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Document;

    #[test]
    fn faq_entries_render_as_question_and_answer() {
        let faq: Document = serde_json::from_value(json!({
            "question": "How long does shipping take?",
            "answer": "5-7 business days."
        }))
        .expect("faq");

        assert_eq!(faq.text(), "Q: How long does shipping take?\nA: 5-7 business days.");
        assert_eq!(faq.title(), "How long does shipping take?");
    }

    #[test]
    fn content_wins_over_answer_and_title_defaults_to_untitled() {
        let doc: Document = serde_json::from_value(json!({
            "content": "Manual body",
            "answer": "ignored"
        }))
        .expect("doc");
        assert_eq!(doc.text(), "Manual body");
        assert_eq!(doc.title(), "Untitled");

        let bare: Document = serde_json::from_value(json!({"note": "loose"})).expect("bare");
        assert!(bare.text().contains("\"note\":\"loose\""));
    }
}

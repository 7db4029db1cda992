//! JSON-LD extraction
//!
//! This module parses HTML and extracts:
//! - Every `<script type="application/ld+json">` block, in document order
//! - The first block whose `@type` names one of the target entity types
//!
//! Extraction is pure: identical markup always yields identical blocks and
//! the identical selection.

use scraper::{Html, Selector};
use serde_json::Value;

/// Entity types selected when no others are configured
pub const DEFAULT_TARGET_TYPES: &[&str] = &["Hotel", "LodgingBusiness"];

const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// A JSON-LD block that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Position of the block among the page's JSON-LD scripts
    pub index: usize,

    /// Parser error message
    pub message: String,
}

/// Everything found in one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionReport {
    /// Parsed blocks in document order
    pub blocks: Vec<Value>,

    /// Blocks that were skipped because they are not valid JSON
    pub failures: Vec<ParseFailure>,
}

/// Extraction plus selection for one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub report: ExtractionReport,
    pub selected: Option<Value>,
}

/// Collects all JSON-LD blocks from an HTML document
///
/// Empty script bodies are ignored. Scripts that are not valid JSON are
/// recorded as [`ParseFailure`]s and logged; they never abort the document.
///
/// # Example
///
/// ```
/// use ld_harvest::crawler::extract_json_ld;
///
/// let html = r#"<script type="application/ld+json">{"@type":"Hotel"}</script>"#;
/// let report = extract_json_ld(html);
/// assert_eq!(report.blocks.len(), 1);
/// assert!(report.failures.is_empty());
/// ```
pub fn extract_json_ld(html: &str) -> ExtractionReport {
    let document = Html::parse_document(html);
    let mut report = ExtractionReport::default();

    let Ok(selector) = Selector::parse(JSON_LD_SELECTOR) else {
        return report;
    };

    for (index, element) in document.select(&selector).enumerate() {
        let text = element.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(block) => {
                if let Some(kind) = block.get("@type") {
                    tracing::debug!("Found JSON-LD type: {}", kind);
                }
                report.blocks.push(block);
            }
            Err(e) => {
                tracing::warn!("JSON-LD parse failure at index {}: {}", index, e);
                report.failures.push(ParseFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    report
}

/// Returns true if the block's `@type` names one of the target types
///
/// `@type` may be a string or an array of strings. Comparison is exact and
/// case-sensitive.
pub fn matches_target_type(block: &Value, target_types: &[String]) -> bool {
    match block.get("@type") {
        Some(Value::String(kind)) => target_types.iter().any(|t| t == kind),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| target_types.iter().any(|t| t == kind)),
        _ => false,
    }
}

/// Picks the first block in document order that matches a target type
pub fn select_entity<'a>(blocks: &'a [Value], target_types: &[String]) -> Option<&'a Value> {
    blocks
        .iter()
        .find(|block| matches_target_type(block, target_types))
}

/// Extraction engine configured with the entity types to select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySelector {
    target_types: Vec<String>,
}

impl EntitySelector {
    pub fn new<S: Into<String>>(target_types: impl IntoIterator<Item = S>) -> Self {
        Self {
            target_types: target_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn target_types(&self) -> &[String] {
        &self.target_types
    }

    /// Extracts all blocks from `html` and selects the target entity
    pub fn extract(&self, html: &str) -> Extraction {
        let report = extract_json_ld(html);
        let selected = select_entity(&report.blocks, &self.target_types).cloned();

        if let Some(entity) = &selected {
            let name = entity
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>");
            tracing::info!("Extracted entity: {}", name);
        }

        Extraction { report, selected }
    }
}

impl Default for EntitySelector {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_TYPES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ld(json: &str) -> String {
        format!(r#"<script type="application/ld+json">{}</script>"#, json)
    }

    fn page(blocks: &[&str]) -> String {
        let scripts: String = blocks.iter().map(|b| ld(b)).collect();
        format!("<html><head>{}</head><body><p>Hi</p></body></html>", scripts)
    }

    fn targets() -> Vec<String> {
        vec!["Hotel".to_string(), "LodgingBusiness".to_string()]
    }

    #[test]
    fn test_collects_blocks_in_document_order() {
        let html = format!(
            "<html><head>{}</head><body>{}</body></html>",
            ld(r#"{"@type":"Organization"}"#),
            ld(r#"{"@type":"BreadcrumbList"}"#)
        );
        let report = extract_json_ld(&html);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[0]["@type"], "Organization");
        assert_eq!(report.blocks[1]["@type"], "BreadcrumbList");
    }

    #[test]
    fn test_ignores_other_script_types() {
        let html = r#"<html><head>
            <script type="text/javascript">var x = {"@type":"Hotel"};</script>
            <script>{"@type":"Hotel"}</script>
        </head></html>"#;
        assert!(extract_json_ld(html).blocks.is_empty());
    }

    #[test]
    fn test_malformed_block_is_skipped_and_recorded() {
        let html = page(&[r#"{"@type": "Hotel", "name": }"#, r#"{"@type":"Hotel","name":"Ok"}"#]);
        let report = extract_json_ld(&html);

        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);

        let selected = select_entity(&report.blocks, &targets());
        assert_eq!(selected.unwrap()["name"], "Ok");
    }

    #[test]
    fn test_empty_script_is_ignored_silently() {
        let html = page(&["", "   "]);
        let report = extract_json_ld(&html);
        assert!(report.blocks.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_array_and_graph_blocks_are_kept_whole() {
        let html = page(&[r#"[{"@type":"Hotel"}]"#, r#"{"@graph":[{"@type":"Hotel"}]}"#]);
        let report = extract_json_ld(&html);
        assert_eq!(report.blocks.len(), 2);
        // Neither top-level value declares @type itself
        assert!(select_entity(&report.blocks, &targets()).is_none());
    }

    #[test]
    fn test_selects_first_match_in_document_order() {
        let blocks = vec![
            json!({"@type": "Article"}),
            json!({"@type": "LodgingBusiness", "name": "X"}),
            json!({"@type": "Hotel", "name": "Y"}),
        ];
        let selected = select_entity(&blocks, &targets()).unwrap();
        assert_eq!(selected["name"], "X");
    }

    #[test]
    fn test_type_array_containing_target() {
        let block = json!({"@type": ["Place", "Hotel"], "name": "Z"});
        assert!(matches_target_type(&block, &targets()));
    }

    #[test]
    fn test_type_match_is_case_sensitive() {
        assert!(!matches_target_type(&json!({"@type": "hotel"}), &targets()));
        assert!(!matches_target_type(&json!({"@type": ["HOTEL"]}), &targets()));
    }

    #[test]
    fn test_missing_or_odd_type_never_matches() {
        assert!(!matches_target_type(&json!({"name": "Hotel"}), &targets()));
        assert!(!matches_target_type(&json!({"@type": 7}), &targets()));
        assert!(!matches_target_type(&json!("Hotel"), &targets()));
    }

    #[test]
    fn test_custom_target_types() {
        let selector = EntitySelector::new(["Restaurant"]);
        let html = page(&[r#"{"@type":"Hotel"}"#, r#"{"@type":"Restaurant","name":"R"}"#]);
        let extraction = selector.extract(&html);
        assert_eq!(extraction.selected.unwrap()["name"], "R");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let selector = EntitySelector::default();
        let html = page(&[
            r#"{"@type":"WebSite","url":"https://example.com"}"#,
            r#"{"@type":"Hotel","name":"Grand Example","starRating":{"ratingValue":4}}"#,
            "{broken",
        ]);

        let first = selector.extract(&html);
        let second = selector.extract(&html);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.report.blocks).unwrap(),
            serde_json::to_string(&second.report.blocks).unwrap()
        );
    }

    #[test]
    fn test_no_blocks_versus_no_match() {
        let selector = EntitySelector::default();

        let bare = selector.extract("<html><body>nothing here</body></html>");
        assert!(bare.report.blocks.is_empty());
        assert!(bare.selected.is_none());

        let other = selector.extract(&page(&[r#"{"@type":"Article"}"#]));
        assert_eq!(other.report.blocks.len(), 1);
        assert!(other.selected.is_none());
    }

    #[test]
    fn test_selects_entities_without_string_name() {
        let selector = EntitySelector::default();

        let unnamed = selector.extract(&page(&[r#"{"@type":"Hotel","url":"https://h"}"#]));
        assert_eq!(unnamed.selected.unwrap()["url"], "https://h");

        let odd = selector.extract(&page(&[r#"{"@type":"Hotel","name":{"@value":"H"}}"#]));
        assert_eq!(odd.selected.unwrap()["name"]["@value"], "H");
    }

    #[test]
    fn test_blocks_keep_page_key_order() {
        let html = page(&[r#"{"name":"Grand","@type":"Hotel","address":"Main St","@context":"https://schema.org"}"#]);
        let report = extract_json_ld(&html);

        assert_eq!(
            serde_json::to_string(&report.blocks[0]).unwrap(),
            r#"{"name":"Grand","@type":"Hotel","address":"Main St","@context":"https://schema.org"}"#
        );
    }

    #[test]
    fn test_default_selector_targets() {
        assert_eq!(
            EntitySelector::default().target_types(),
            &["Hotel".to_string(), "LodgingBusiness".to_string()]
        );
    }
}

//! Dotted-path resolution over raw schema documents.
//!
//! Schema authors address design references by nested keys
//! (`desktop.grid.vendor`). A missing key at any depth is not an error, and
//! neither is an empty string: many documents encode "no design yet" as
//! `""` rather than omitting the key, so both resolve to absent.

use serde_json::Value;

use crate::domain::error::DomainError;
use crate::util::text::slugify;

/// A parsed dotted path into a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotPath {
    segments: Vec<String>,
}

impl SlotPath {
    /// Parse a dotted path. Fails only when no non-empty segment remains.
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        let segments: Vec<String> = path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(DomainError::validation(format!(
                "slot path `{path}` has no segments"
            )));
        }
        Ok(Self { segments })
    }

    /// The canonical dotted form.
    pub fn key(&self) -> String {
        self.segments.join(".")
    }

    /// Extend the path with a normalized entry name (table mode sub-keys).
    pub fn child(&self, entry_name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(slugify(entry_name));
        Self { segments }
    }

    /// Descend through the document key-by-key. Returns `None` as soon as a
    /// segment is missing or a non-object is reached before the path ends.
    fn descend<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolve to a single design reference string, or absent.
    ///
    /// Null, non-string, and empty-string terminal values all count as
    /// absent; resolution never fails for a missing path.
    pub fn resolve_reference(&self, document: &Value) -> Option<String> {
        let value = self.descend(document)?;
        let text = value.as_str()?;
        if text.is_empty() {
            return None;
        }
        Some(text.to_string())
    }

    /// Resolve to a table of named references, in document order.
    ///
    /// Absent (or non-object) resolves to an empty list. Each entry yields
    /// its raw name and its reference resolved with the same absence rules
    /// as [`resolve_reference`](Self::resolve_reference).
    pub fn resolve_table<'a>(&self, document: &'a Value) -> Vec<(&'a str, Option<String>)> {
        let Some(table) = self.descend(document).and_then(Value::as_object) else {
            return Vec::new();
        };
        table
            .iter()
            .map(|(name, value)| {
                let reference = value
                    .as_str()
                    .filter(|text| !text.is_empty())
                    .map(str::to_string);
                (name.as_str(), reference)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SlotPath;
    use serde_json::json;

    fn path(text: &str) -> SlotPath {
        SlotPath::parse(text).expect("valid path")
    }

    #[test]
    fn resolves_nested_reference() {
        let doc = json!({"desktop": {"grid": {"vendor": "https://example/frame"}}});
        assert_eq!(
            path("desktop.grid.vendor").resolve_reference(&doc),
            Some("https://example/frame".to_string())
        );
    }

    #[test]
    fn missing_segment_is_absent_not_an_error() {
        let doc = json!({"desktop": {}});
        assert_eq!(path("desktop.grid.vendor").resolve_reference(&doc), None);
        assert_eq!(path("mobile.list.client").resolve_reference(&doc), None);
    }

    #[test]
    fn non_object_midway_is_absent() {
        let doc = json!({"desktop": "oops"});
        assert_eq!(path("desktop.grid.vendor").resolve_reference(&doc), None);
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let doc = json!({"state-diagram": ""});
        assert_eq!(path("state-diagram").resolve_reference(&doc), None);
    }

    #[test]
    fn null_and_non_string_count_as_absent() {
        let doc = json!({"a": null, "b": 7, "c": {"k": "v"}});
        assert_eq!(path("a").resolve_reference(&doc), None);
        assert_eq!(path("b").resolve_reference(&doc), None);
        assert_eq!(path("c").resolve_reference(&doc), None);
    }

    #[test]
    fn resolution_is_pure() {
        let doc = json!({"state-diagram": "https://example/frame"});
        let slot = path("state-diagram");
        assert_eq!(slot.resolve_reference(&doc), slot.resolve_reference(&doc));
    }

    #[test]
    fn zero_segments_is_rejected() {
        assert!(SlotPath::parse("").is_err());
        assert!(SlotPath::parse("..").is_err());
    }

    #[test]
    fn table_mode_keeps_document_order_and_absence_rules() {
        let doc = json!({
            "email-notifications": {
                "vendor": {
                    "Order Ready": "https://example/a",
                    "Order Shipped": "",
                    "Order Lost": "https://example/b"
                }
            }
        });
        let entries = path("email-notifications.vendor").resolve_table(&doc);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "Order Ready");
        assert_eq!(entries[0].1.as_deref(), Some("https://example/a"));
        assert_eq!(entries[1].1, None);
        assert_eq!(entries[2].0, "Order Lost");
    }

    #[test]
    fn table_mode_on_missing_or_scalar_is_empty() {
        let doc = json!({"email-notifications": {"vendor": "not a table"}});
        assert!(path("email-notifications.vendor").resolve_table(&doc).is_empty());
        assert!(path("email-notifications.client").resolve_table(&doc).is_empty());
    }

    #[test]
    fn child_appends_normalized_entry_name() {
        let slot = path("email-notifications.vendor").child("  Order Ready ");
        assert_eq!(slot.key(), "email-notifications.vendor.order-ready");
    }
}

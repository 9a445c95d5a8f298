//! Conversion between plain text and Atlassian Document Format (ADF).
//!
//! Jira's v3 API carries descriptions and comment bodies as ADF documents.
//! Outbound text becomes one paragraph per line; inbound documents are
//! flattened back to text, so plain text survives a create/fetch trip.
//! Trailing newlines are not kept, and an empty document reads back as no
//! text at all.

use serde_json::{json, Value};

/// Wraps plain text in an ADF `doc`, one paragraph per line.
pub fn text_to_adf(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                json!({ "type": "paragraph" })
            } else {
                json!({
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": line }]
                })
            }
        })
        .collect();

    json!({
        "type": "doc",
        "version": 1,
        "content": paragraphs,
    })
}

/// Flattens an ADF document (or a legacy plain string) to text.
pub fn adf_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => {
            let mut out = String::new();
            render(value, &mut out);
            out.trim_end_matches('\n').to_string()
        }
        other => other.to_string(),
    }
}

fn render(node: &Value, out: &mut String) {
    if let Value::Array(nodes) = node {
        for child in nodes {
            render(child, out);
        }
        return;
    }

    let attrs = &node["attrs"];
    match node["type"].as_str() {
        Some("text") => out.push_str(node["text"].as_str().unwrap_or_default()),
        Some("hardBreak") => out.push('\n'),
        Some("mention") | Some("emoji") => {
            let text = attrs["text"]
                .as_str()
                .or_else(|| attrs["shortName"].as_str())
                .unwrap_or_default();
            out.push_str(text);
        }
        Some("inlineCard") => out.push_str(attrs["url"].as_str().unwrap_or_default()),
        Some("rule") => out.push_str("---\n"),
        Some("listItem") => {
            out.push_str("- ");
            render_children(node, out);
        }
        Some("paragraph") | Some("heading") | Some("codeBlock") => {
            render_children(node, out);
            out.push('\n');
        }
        _ => render_children(node, out),
    }
}

fn render_children(node: &Value, out: &mut String) {
    if let Some(children) = node["content"].as_array() {
        for child in children {
            render(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let doc = text_to_adf("Login fails on Safari");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["content"][0]["content"][0]["text"], "Login fails on Safari");
        assert_eq!(adf_to_text(&doc), "Login fails on Safari");
    }

    #[test]
    fn test_multiline_with_blank_line_survives() {
        let text = "Steps:\n\nOpen the page\nClick login";
        assert_eq!(adf_to_text(&text_to_adf(text)), text);
    }

    #[test]
    fn test_empty_text_is_empty_doc() {
        let doc = text_to_adf("");
        assert_eq!(doc["content"].as_array().unwrap().len(), 0);
        assert_eq!(adf_to_text(&doc), "");
    }

    #[test]
    fn test_plain_string_and_null() {
        assert_eq!(adf_to_text(&Value::String("legacy body".into())), "legacy body");
        assert_eq!(adf_to_text(&Value::Null), "");
    }

    #[test]
    fn test_rich_nodes() {
        let doc = json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Context"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Ping "},
                    {"type": "mention", "attrs": {"id": "1", "text": "@Dana"}},
                    {"type": "hardBreak"},
                    {"type": "text", "text": "see "},
                    {"type": "inlineCard", "attrs": {"url": "https://example.com"}}
                ]},
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "one"}]}]},
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "two"}]}]}
                ]}
            ]
        });

        assert_eq!(
            adf_to_text(&doc),
            "Context\nPing @Dana\nsee https://example.com\n- one\n- two"
        );
    }
}

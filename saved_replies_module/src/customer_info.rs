//! Renders customer metadata into the plain-text block agents see next to a
//! conversation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Free-form metadata value as attached by integrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    fn is_blank(&self) -> bool {
        match self {
            MetadataValue::Null => true,
            MetadataValue::Text(text) => text.trim().is_empty(),
            MetadataValue::List(items) => items.iter().all(MetadataValue::is_blank),
            MetadataValue::Map(entries) => entries.values().all(MetadataValue::is_blank),
            MetadataValue::Bool(_) | MetadataValue::Number(_) => false,
        }
    }

    fn scalar(&self) -> Option<String> {
        match self {
            MetadataValue::Bool(value) => Some(value.to_string()),
            MetadataValue::Number(value) => Some(format_number(*value)),
            MetadataValue::Text(value) => Some(value.trim().to_string()),
            MetadataValue::Null | MetadataValue::List(_) | MetadataValue::Map(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetadata {
    #[serde(default)]
    pub name: Option<String>,
    /// Monetary or plan value, in whatever unit the integration reports.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

pub fn customer_info_prompt(email: &str, customer: &CustomerMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Customer email: {}", email.trim());
    if let Some(name) = customer.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "Name: {name}");
    }
    if let Some(value) = customer.value {
        let _ = writeln!(out, "Value: {}", format_number(value));
    }

    let links: Vec<_> = customer
        .links
        .iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .collect();
    if !links.is_empty() {
        out.push_str("Links:\n");
        for (label, url) in links {
            let _ = writeln!(out, "  {label}: {}", url.trim());
        }
    }

    if customer.metadata.values().any(|value| !value.is_blank()) {
        out.push_str("Metadata:\n");
        write_entries(&mut out, &customer.metadata, 1);
    }
    out
}

fn write_entries(out: &mut String, entries: &BTreeMap<String, MetadataValue>, depth: usize) {
    let indent = "  ".repeat(depth);
    for (key, value) in entries {
        if value.is_blank() {
            continue;
        }
        match value.scalar() {
            Some(text) => {
                let _ = writeln!(out, "{indent}{key}: {text}");
            }
            None => {
                let _ = writeln!(out, "{indent}{key}:");
                write_nested(out, value, depth + 1);
            }
        }
    }
}

fn write_nested(out: &mut String, value: &MetadataValue, depth: usize) {
    match value {
        MetadataValue::Map(entries) => write_entries(out, entries, depth),
        MetadataValue::List(items) => {
            let indent = "  ".repeat(depth);
            for item in items.iter().filter(|item| !item.is_blank()) {
                match item.scalar() {
                    Some(text) => {
                        let _ = writeln!(out, "{indent}- {text}");
                    }
                    None => {
                        let _ = writeln!(out, "{indent}-");
                        write_nested(out, item, depth + 1);
                    }
                }
            }
        }
        _ => {}
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(json: &str) -> BTreeMap<String, MetadataValue> {
        serde_json::from_str(json).expect("metadata json")
    }

    #[test]
    fn renders_email_only() {
        let prompt = customer_info_prompt(" jane@example.com ", &CustomerMetadata::default());
        assert_eq!(prompt, "Customer email: jane@example.com\n");
    }

    #[test]
    fn renders_all_sections_in_order() {
        let mut links = BTreeMap::new();
        links.insert("Dashboard".to_string(), "https://example.com/c/42".to_string());
        links.insert("Empty".to_string(), "  ".to_string());
        let customer = CustomerMetadata {
            name: Some("Jane Doe".to_string()),
            value: Some(1200.0),
            links,
            metadata: metadata(
                r#"{
                    "plan": "pro",
                    "seats": 5,
                    "ratio": 0.25,
                    "trial": false,
                    "deleted": null,
                    "tags": ["vip", null, "beta"],
                    "address": {"city": "Lisbon", "zip": null}
                }"#,
            ),
        };

        let expected = "\
Customer email: jane@example.com
Name: Jane Doe
Value: 1200
Links:
  Dashboard: https://example.com/c/42
Metadata:
  address:
    city: Lisbon
  plan: pro
  ratio: 0.25
  seats: 5
  tags:
    - vip
    - beta
  trial: false
";
        assert_eq!(customer_info_prompt("jane@example.com", &customer), expected);
    }

    #[test]
    fn nested_lists_of_maps_are_indented() {
        let customer = CustomerMetadata {
            metadata: metadata(r#"{"orders": [{"id": "A1", "total": 9.5}]}"#),
            ..CustomerMetadata::default()
        };
        let expected = "\
Customer email: a@b.com
Metadata:
  orders:
    -
      id: A1
      total: 9.5
";
        assert_eq!(customer_info_prompt("a@b.com", &customer), expected);
    }

    #[test]
    fn blank_metadata_is_omitted() {
        let customer = CustomerMetadata {
            name: Some("   ".to_string()),
            metadata: metadata(r#"{"a": null, "b": [], "c": {}, "d": ""}"#),
            ..CustomerMetadata::default()
        };
        assert_eq!(
            customer_info_prompt("a@b.com", &customer),
            "Customer email: a@b.com\n"
        );
    }

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let parsed = metadata(r#"{"n": 3, "s": "x", "b": true, "l": [1], "m": {"k": null}}"#);
        assert_eq!(parsed["n"], MetadataValue::Number(3.0));
        assert_eq!(parsed["s"], MetadataValue::Text("x".to_string()));
        assert_eq!(parsed["b"], MetadataValue::Bool(true));
        assert_eq!(parsed["l"], MetadataValue::List(vec![MetadataValue::Number(1.0)]));
        assert!(matches!(&parsed["m"], MetadataValue::Map(map) if map["k"] == MetadataValue::Null));
    }
}

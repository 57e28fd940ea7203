//! `[key:value]` tags embedded in schema descriptions.
//!
//! Provider schemas carry rendering hints inside `description`, e.g.
//! `"Duration of the clip [renderType:slider][unit:s][showWhen:mode=video]"`.
//! Recognised keys are `renderType`, `unit` and `showWhen`; anything else is
//! kept in [`Annotations::extra`]. The tags are removed from the text shown
//! to the user.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*):([^\]]*)\]").expect("annotation pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub render_type: Option<String>,
    pub unit: Option<String>,
    pub show_when: Option<ShowWhen>,
    pub extra: BTreeMap<String, String>,
}

impl Annotations {
    /// Splits a raw description into its annotations and the display text
    pub fn parse(description: &str) -> (Self, String) {
        let mut annotations = Annotations::default();

        for capture in tag_pattern().captures_iter(description) {
            let key = &capture[1];
            let value = capture[2].trim();
            match key {
                "renderType" => annotations.render_type = Some(value.to_string()),
                "unit" => annotations.unit = Some(value.to_string()),
                "showWhen" => match ShowWhen::parse(value) {
                    Some(condition) => annotations.show_when = Some(condition),
                    None => tracing::warn!(condition = %value, "Ignoring malformed showWhen"),
                },
                _ => {
                    annotations.extra.insert(key.to_string(), value.to_string());
                }
            }
        }

        let text = tag_pattern().replace_all(description, "");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (annotations, text)
    }

    pub fn is_empty(&self) -> bool {
        self.render_type.is_none()
            && self.unit.is_none()
            && self.show_when.is_none()
            && self.extra.is_empty()
    }
}

/// Visibility condition on a sibling field: `field=value`, `field!=value`,
/// with `a|b` accepting any of several values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowWhen {
    pub field: String,
    pub values: Vec<String>,
    pub negate: bool,
}

impl ShowWhen {
    pub fn parse(condition: &str) -> Option<Self> {
        let (field, values, negate) = match condition.split_once("!=") {
            Some((field, values)) => (field, values, true),
            None => {
                let (field, values) = condition.split_once('=')?;
                (field, values, false)
            }
        };

        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        let values = values.split('|').map(|v| v.trim().to_string()).collect();
        Some(Self {
            field: field.to_string(),
            values,
            negate,
        })
    }

    /// Whether the dependent field is visible given the controlling value
    pub fn is_met(&self, value: Option<&Value>) -> bool {
        let current = match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        self.values.iter().any(|v| *v == current) != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_strips_tags() {
        let (annotations, text) = Annotations::parse(
            "Clip length [renderType:slider] in seconds [unit:s][showWhen:mode=video]",
        );
        assert_eq!(text, "Clip length in seconds");
        assert_eq!(annotations.render_type.as_deref(), Some("slider"));
        assert_eq!(annotations.unit.as_deref(), Some("s"));
        let condition = annotations.show_when.unwrap();
        assert_eq!(condition.field, "mode");
        assert_eq!(condition.values, vec!["video".to_string()]);
        assert!(!condition.negate);
    }

    #[test]
    fn test_plain_description_has_no_annotations() {
        let (annotations, text) = Annotations::parse("Seed for reproducible results");
        assert!(annotations.is_empty());
        assert_eq!(text, "Seed for reproducible results");
    }

    #[test]
    fn test_show_when_value_sets_and_negation() {
        let any_of = ShowWhen::parse("quality=hd|4k").unwrap();
        assert!(any_of.is_met(Some(&json!("4k"))));
        assert!(!any_of.is_met(Some(&json!("sd"))));

        let not = ShowWhen::parse("enhance!=true").unwrap();
        assert!(not.negate);
        assert!(not.is_met(Some(&json!(false))));
        assert!(!not.is_met(Some(&json!(true))));
        assert!(not.is_met(None));

        let numeric = ShowWhen::parse("steps=4").unwrap();
        assert!(numeric.is_met(Some(&json!(4))));

        assert!(ShowWhen::parse("=x").is_none());
        assert!(ShowWhen::parse("novalue").is_none());
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let (annotations, _) = Annotations::parse("[group:advanced] Guidance");
        assert_eq!(annotations.extra.get("group").map(String::as_str), Some("advanced"));
    }
}

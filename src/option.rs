use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::comparison::RequiredValues;
use crate::errors::{EngineError, Result};

/// Read-only descriptor of one configurable option for a rendering pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub key: String,
    /// Render order; anything unusable in the input is read as `0`.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
    /// Enclosing grouping element, used to scope lookups in embedded editors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

/// Visibility rule: show the option only while `controller_key` holds one of
/// the required values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(alias = "parent")]
    pub controller_key: String,
    #[serde(alias = "values")]
    pub required: RequiredValues,
}

impl OptionDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), priority: 0, dependency: None, container: None }
    }

    /// Set a priority from code. Unlike markup input, this is validated.
    pub fn with_priority(mut self, priority: i64) -> Result<Self> {
        if priority < 1 {
            return Err(EngineError::InvalidPriority(priority));
        }
        self.priority = priority;
        Ok(self)
    }

    pub fn depends_on(mut self, controller_key: impl Into<String>, required: RequiredValues) -> Self {
        self.dependency = Some(Dependency { controller_key: controller_key.into(), required });
        self
    }

    pub fn in_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

impl Dependency {
    /// Build from the `data-dep` / `data-dep_val` attribute pair of the
    /// element `dependent`.
    pub fn from_attributes(dependent: &str, dep: &str, dep_val: &str) -> Result<Self> {
        let controller_key = dep.trim();
        if controller_key.is_empty() {
            return Err(EngineError::MalformedDependency(format!("`{dependent}` has an empty controller key")));
        }
        let required = RequiredValues::from_json_str(dep_val).map_err(|reason| {
            EngineError::MalformedRequiredValues {
                dependent: dependent.to_string(),
                controller: controller_key.to_string(),
                reason,
            }
        })?;
        Ok(Self { controller_key: controller_key.to_string(), required })
    }

    /// The `data-dep` / `data-dep_val` attribute values for this rule.
    pub fn to_attributes(&self) -> (String, String) {
        let payload = Value::from(self.required.clone()).to_string();
        (self.controller_key.clone(), payload)
    }
}

/// Read a priority the way markup hands it over: integers and numeric text
/// are honoured, fractions truncate, everything else counts as `0`.
pub fn coerce_priority(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(coerce_priority(&v))
}

/// Derive an option key from a display name: `"Float Button Style!"` -> `"float_button_style"`.
pub fn name_to_key(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::FieldValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn priority_coercion() {
        assert_eq!(coerce_priority(&json!(7)), 7);
        assert_eq!(coerce_priority(&json!("12")), 12);
        assert_eq!(coerce_priority(&json!(" 4 ")), 4);
        assert_eq!(coerce_priority(&json!(2.9)), 2);
        assert_eq!(coerce_priority(&json!("high")), 0);
        assert_eq!(coerce_priority(&json!(null)), 0);
        assert_eq!(coerce_priority(&json!([1])), 0);
    }

    #[test]
    fn descriptor_from_json_is_lenient() {
        let opt: OptionDescriptor = serde_json::from_value(json!({
            "key": "float_style",
            "priority": "not a number",
            "dependency": { "parent": "floating_panel", "values": [true] }
        }))
        .unwrap();
        assert_eq!(opt.priority, 0);
        let dep = opt.dependency.unwrap();
        assert_eq!(dep.controller_key, "floating_panel");
        assert_eq!(dep.required, RequiredValues::Set(vec![FieldValue::Bool(true)]));

        let bare: OptionDescriptor = serde_json::from_value(json!({ "key": "x" })).unwrap();
        assert_eq!(bare, OptionDescriptor::new("x"));
    }

    #[test]
    fn strict_priority_rejects_non_positive() {
        assert!(matches!(
            OptionDescriptor::new("a").with_priority(0),
            Err(EngineError::InvalidPriority(0))
        ));
        assert!(OptionDescriptor::new("a").with_priority(-3).is_err());
        assert_eq!(OptionDescriptor::new("a").with_priority(10).unwrap().priority, 10);
    }

    #[test]
    fn attributes_round_trip_the_wire_format() {
        let dep = Dependency::from_attributes(
            "float_custom_color",
            "float_default_colors",
            r#"["custom_color","custom_color_outlines"]"#,
        )
        .unwrap();
        assert_eq!(
            dep.to_attributes(),
            (
                "float_default_colors".to_string(),
                r#"["custom_color","custom_color_outlines"]"#.to_string()
            )
        );
    }

    #[test]
    fn malformed_attributes() {
        assert!(matches!(
            Dependency::from_attributes("float_custom_color", "", "[]"),
            Err(EngineError::MalformedDependency(_))
        ));
        match Dependency::from_attributes("float_custom_color", "float_style", "['single quotes']") {
            Err(EngineError::MalformedRequiredValues { dependent, controller, .. }) => {
                assert_eq!(dependent, "float_custom_color");
                assert_eq!(controller, "float_style");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn keys_from_names() {
        assert_eq!(name_to_key("Float Button Style!"), "float_button_style");
        assert_eq!(name_to_key("  Pinterest   Image "), "pinterest_image");
        assert_eq!(name_to_key("og_title"), "og_title");
    }
}

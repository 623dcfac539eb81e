use serde_json::Value;

/// A controller value after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Normalize raw control text. Only the literals `"true"` and `"false"`
    /// become booleans; numeric-looking text stays text.
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Map one element of a decoded required-values payload.
    ///
    /// Numbers are accepted and become their decimal text, so `[1]` matches a
    /// control whose value is `"1"`. Hosts are expected to emit only strings
    /// and booleans; a strict type-and-value comparison would never match a
    /// numeric entry against control text.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Number(n) => Some(FieldValue::Text(n.to_string())),
            _ => None,
        }
    }
}

impl From<FieldValue> for Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Text(s) => Value::String(s),
        }
    }
}

/// The values a controller must hold for a dependent to show.
///
/// Payloads are normally arrays, but a bare scalar is accepted as well and
/// kept distinct: only [`RequiredValues::equals_scalar`] can match it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum RequiredValues {
    Set(Vec<FieldValue>),
    Scalar(FieldValue),
}

impl RequiredValues {
    /// Decode a JSON-encoded payload such as `["custom_color", true]`.
    pub fn from_json_str(s: &str) -> std::result::Result<Self, String> {
        let v: Value = serde_json::from_str(s).map_err(|e| e.to_string())?;
        Self::try_from(v)
    }

    /// Set membership. A scalar payload has no members.
    pub fn contains(&self, value: &FieldValue) -> bool {
        match self {
            RequiredValues::Set(items) => items.iter().any(|item| item == value),
            RequiredValues::Scalar(_) => false,
        }
    }

    /// Strict equality against a scalar payload; never true for a set.
    pub fn equals_scalar(&self, value: &FieldValue) -> bool {
        match self {
            RequiredValues::Scalar(expected) => expected == value,
            RequiredValues::Set(_) => false,
        }
    }
}

impl TryFrom<Value> for RequiredValues {
    type Error = String;

    fn try_from(v: Value) -> std::result::Result<Self, Self::Error> {
        match v {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    FieldValue::from_json(item)
                        .ok_or_else(|| format!("unsupported required value `{item}`"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(RequiredValues::Set),
            other => FieldValue::from_json(&other)
                .map(RequiredValues::Scalar)
                .ok_or_else(|| format!("unsupported required values `{other}`")),
        }
    }
}

impl From<RequiredValues> for Value {
    fn from(r: RequiredValues) -> Self {
        match r {
            RequiredValues::Set(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            RequiredValues::Scalar(v) => v.into(),
        }
    }
}

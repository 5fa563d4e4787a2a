// Expected value tree
//
// What a test author expects a remote value to look like

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Exact match against the remote value's `value` field
    Scalar(Value),
    /// Field-by-field match against the remote object itself
    /// (`type`, `value`, `className`, `subtype`, `description`, ...)
    Descriptor(Map<String, Value>),
    /// Named properties of a remote object, in declaration order
    Object(Vec<(String, Expected)>),
    /// Positional elements of a remote array
    Array(Vec<Expected>),
}

impl Expected {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    /// Descriptor with just `type` and `value`
    pub fn typed(type_name: &str, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(type_name.to_string()));
        fields.insert("value".to_string(), value.into());
        Self::Descriptor(fields)
    }

    pub fn descriptor<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Descriptor(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn object<I, K>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, Expected)>,
        K: Into<String>,
    {
        Self::Object(props.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Expected>,
    {
        Self::Array(items.into_iter().collect())
    }

    /// Interpret a JSON literal.
    ///
    /// Objects carrying a `type` key describe a remote value directly; other objects
    /// describe properties, arrays describe elements, anything else is a scalar.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("type") => Self::Descriptor(map.clone()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
            Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            scalar => Self::Scalar(scalar.clone()),
        }
    }

    /// True for expectations that must be answered by fetching properties
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Descriptor(_) => "descriptor",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

impl From<&str> for Expected {
    fn from(value: &str) -> Self {
        Self::value(value)
    }
}

impl From<String> for Expected {
    fn from(value: String) -> Self {
        Self::value(value)
    }
}

impl From<bool> for Expected {
    fn from(value: bool) -> Self {
        Self::value(value)
    }
}

impl From<i64> for Expected {
    fn from(value: i64) -> Self {
        Self::value(value)
    }
}

impl From<f64> for Expected {
    fn from(value: f64) -> Self {
        Self::value(value)
    }
}

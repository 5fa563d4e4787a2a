// Remote object matcher
//
// Walks an expected value tree against the remote object graph. Remote objects are
// expanded lazily: one property fetch per reference the expected tree actually reaches.

use crate::error::{HarnessError, HarnessResult};
use crate::expected::Expected;
use async_recursion::async_recursion;
use async_trait::async_trait;
use cdp_client::{PropertyDescriptor, RemoteObject};
use serde_json::{Map, Value};
use tracing::debug;

/// Where nested remote objects are expanded from
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn get_properties(&self, object_id: &str) -> HarnessResult<Vec<PropertyDescriptor>>;
}

pub struct Matcher<'a> {
    source: &'a dyn PropertySource,
}

impl<'a> Matcher<'a> {
    pub fn new(source: &'a dyn PropertySource) -> Self {
        Self { source }
    }

    /// Match a property list (locals, or the members of one object).
    ///
    /// `num_fields` overrides the number of properties expected to be present.
    #[async_recursion]
    pub async fn match_props(
        &self,
        actual: &[PropertyDescriptor],
        expected: &Expected,
        label: &str,
        num_fields: Option<usize>,
    ) -> HarnessResult<()> {
        match expected {
            Expected::Array(items) => {
                let count = num_fields.unwrap_or(items.len());
                if count != actual.len() {
                    return Err(HarnessError::mismatch(
                        label,
                        "number of elements don't match",
                        count,
                        actual.len(),
                    ));
                }

                for (i, (exp, act)) in items.iter().zip(actual).enumerate() {
                    let element_name = format!("[{}]", i);
                    if act.name != element_name {
                        return Err(HarnessError::mismatch(
                            format!("{}-{}.name", label, element_name),
                            "unexpected element name",
                            element_name,
                            &act.name,
                        ));
                    }
                    let value = property_value(act, label)?;
                    self.match_value(value, exp, &format!("{}-{}th value", label, i))
                        .await?;
                }
                Ok(())
            }
            Expected::Object(props) => {
                let count = num_fields.unwrap_or(props.len());
                if count != actual.len() {
                    return Err(HarnessError::mismatch(
                        label,
                        "number of fields don't match",
                        count,
                        actual.len(),
                    ));
                }

                for (name, exp) in props {
                    let prop = find_property(actual, name).ok_or_else(|| {
                        HarnessError::mismatch(
                            label,
                            format!("could not find property named '{}'", name),
                            name,
                            property_names(actual),
                        )
                    })?;
                    let value = property_value(prop, label)?;

                    if let Expected::Array(_) = exp {
                        let nested_label = format!("{}-{}", label, name);
                        let members = self.fetch(value, &nested_label).await?;
                        self.match_props(&members, exp, &nested_label, None).await?;
                    } else {
                        self.match_value(value, exp, &format!("{}#{}", label, name))
                            .await?;
                    }
                }
                Ok(())
            }
            other => Err(HarnessError::mismatch(
                label,
                "expected a single value, got a property list",
                other.kind(),
                format!("{} properties", actual.len()),
            )),
        }
    }

    /// Match one remote value
    #[async_recursion]
    pub async fn match_value(
        &self,
        actual: &RemoteObject,
        expected: &Expected,
        label: &str,
    ) -> HarnessResult<()> {
        match expected {
            Expected::Scalar(value) => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), value.clone());
                match_fields(actual, &fields, label)
            }
            Expected::Descriptor(fields) => {
                // no `type` against a reference: the fields name the object's properties
                if !fields.contains_key("type") && actual.is_reference() {
                    let nested = Expected::Object(
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), Expected::from_json(v)))
                            .collect(),
                    );
                    return self.expand_and_match(actual, &nested, label).await;
                }
                match_fields(actual, fields, label)
            }
            Expected::Object(props) => {
                if actual.is_reference() {
                    return self.expand_and_match(actual, expected, label).await;
                }
                // an inline value can only be checked field by field
                let mut fields = Map::new();
                for (name, exp) in props {
                    match exp {
                        Expected::Scalar(v) => {
                            fields.insert(name.clone(), v.clone());
                        }
                        nested => {
                            return Err(HarnessError::mismatch(
                                label,
                                format!("expected an object reference for nested field '{}'", name),
                                nested.kind(),
                                Value::Object(actual.fields.clone()),
                            ))
                        }
                    }
                }
                match_fields(actual, &fields, label)
            }
            Expected::Array(_) => {
                if !actual.is_reference() {
                    return Err(HarnessError::mismatch(
                        label,
                        "expected an array",
                        "array reference",
                        Value::Object(actual.fields.clone()),
                    ));
                }
                self.expand_and_match(actual, expected, label).await
            }
        }
    }

    async fn expand_and_match(
        &self,
        actual: &RemoteObject,
        expected: &Expected,
        label: &str,
    ) -> HarnessResult<()> {
        let nested_label = format!("{}-{}", label, actual.object_id().unwrap_or_default());
        let members = self.fetch(actual, &nested_label).await?;
        self.match_props(&members, expected, &nested_label, None).await
    }

    async fn fetch(
        &self,
        value: &RemoteObject,
        label: &str,
    ) -> HarnessResult<Vec<PropertyDescriptor>> {
        let object_id = value.object_id().ok_or_else(|| {
            HarnessError::mismatch(
                label,
                "expected an object reference",
                "objectId",
                Value::Object(value.fields.clone()),
            )
        })?;
        debug!("[{}] Expanding {}", label, object_id);
        self.source.get_properties(object_id).await
    }
}

/// Compare every expected field against the remote value's field of the same name.
///
/// Values compare by their string form. An expected null or empty string also
/// accepts a missing, null or empty actual field.
pub fn match_fields(
    actual: &RemoteObject,
    expected: &Map<String, Value>,
    label: &str,
) -> HarnessResult<()> {
    for (name, exp) in expected {
        let exp_repr = repr(exp);
        let act = actual.get(name);
        let act_repr = act.and_then(repr);

        if is_blank(&exp_repr) && is_blank(&act_repr) {
            continue;
        }

        if act.is_none() {
            return Err(HarnessError::mismatch(
                label,
                format!("could not find value field named {}", name),
                display(&exp_repr),
                "<missing>",
            ));
        }

        if exp_repr != act_repr {
            return Err(HarnessError::mismatch(
                label,
                format!("value for json property named {} didn't match", name),
                display(&exp_repr),
                display(&act_repr),
            ));
        }
    }
    Ok(())
}

pub fn find_property<'p>(props: &'p [PropertyDescriptor], name: &str) -> Option<&'p PropertyDescriptor> {
    props.iter().find(|p| p.name == name)
}

fn property_value<'p>(prop: &'p PropertyDescriptor, label: &str) -> HarnessResult<&'p RemoteObject> {
    prop.value.as_ref().ok_or_else(|| {
        HarnessError::mismatch(
            label,
            format!("no value found for property named '{}'", prop.name),
            "value",
            "<missing>",
        )
    })
}

fn property_names(props: &[PropertyDescriptor]) -> String {
    props
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// String form used for comparison; None for null
pub(crate) fn repr(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            // 30.0 and 30 are the same number on the wire
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn is_blank(repr: &Option<String>) -> bool {
    repr.as_deref().map_or(true, str::is_empty)
}

fn display(repr: &Option<String>) -> String {
    repr.clone().unwrap_or_else(|| "null".to_string())
}

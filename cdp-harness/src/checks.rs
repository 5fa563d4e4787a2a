// Convenience checks over a property list
//
// Shorthands for the common "this local is a number/string/object of class X" assertions.
// Unlike the matcher these compare exactly: an expected `None` means the field is absent.

use crate::error::{HarnessError, HarnessResult};
use crate::matcher::{self, match_fields};
use cdp_client::{PropertyDescriptor, RemoteObject};
use serde_json::{Map, Value};

/// The named property, or a mismatch listing what is there
pub fn find_property<'p>(
    props: &'p [PropertyDescriptor],
    name: &str,
) -> HarnessResult<&'p PropertyDescriptor> {
    matcher::find_property(props, name).ok_or_else(|| {
        HarnessError::mismatch(
            name,
            format!("could not find variable '{}'", name),
            name,
            props
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    })
}

fn value_of<'p>(prop: &'p PropertyDescriptor) -> HarnessResult<&'p RemoteObject> {
    prop.value.as_ref().ok_or_else(|| {
        HarnessError::mismatch(&prop.name, "variable has no value", "value", "<missing>")
    })
}

fn field(value: &RemoteObject, name: &str) -> Option<String> {
    value.get(name).and_then(matcher::repr)
}

fn expect_field(
    label: &str,
    value: &RemoteObject,
    name: &str,
    expected: Option<&str>,
) -> HarnessResult<()> {
    let actual = field(value, name);
    if actual.as_deref() != expected {
        return Err(HarnessError::mismatch(
            label,
            format!("field {} didn't match", name),
            expected.unwrap_or("<missing>"),
            actual.as_deref().unwrap_or("<missing>"),
        ));
    }
    Ok(())
}

fn expect_flag(label: &str, value: &RemoteObject, name: &str, expected: bool) -> HarnessResult<()> {
    if value.flag(name) != expected {
        return Err(HarnessError::mismatch(
            label,
            format!("flag {} didn't match", name),
            expected,
            value.flag(name),
        ));
    }
    Ok(())
}

pub fn check_number(
    props: &[PropertyDescriptor],
    name: &str,
    expected: impl Into<Value>,
) -> HarnessResult<()> {
    let value = value_of(find_property(props, name)?)?;
    expect_field(name, value, "type", Some("number"))?;

    let mut fields = Map::new();
    fields.insert("value".to_string(), expected.into());
    match_fields(value, &fields, name)
}

/// A `None` string is a null object reference
pub fn check_string(
    props: &[PropertyDescriptor],
    name: &str,
    expected: Option<&str>,
) -> HarnessResult<()> {
    let value = value_of(find_property(props, name)?)?;
    match expected {
        None => {
            expect_field(name, value, "type", Some("object"))?;
            expect_field(name, value, "subtype", Some("null"))
        }
        Some(s) => {
            expect_field(name, value, "type", Some("string"))?;
            expect_field(name, value, "value", Some(s))
        }
    }
}

pub fn check_bool(props: &[PropertyDescriptor], name: &str, expected: bool) -> HarnessResult<()> {
    let value = value_of(find_property(props, name)?)?;
    expect_field(name, value, "type", Some("boolean"))?;
    match value.value().and_then(Value::as_bool) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(HarnessError::mismatch(name, "boolean value didn't match", expected, actual)),
        None => Err(HarnessError::mismatch(
            name,
            "expected bool value not found",
            expected,
            "<missing>",
        )),
    }
}

/// A reference-type object of `class_name`; `is_null` expects the null subtype
pub fn check_object<'p>(
    props: &'p [PropertyDescriptor],
    name: &str,
    class_name: &str,
    subtype: Option<&str>,
    is_null: bool,
) -> HarnessResult<&'p PropertyDescriptor> {
    let prop = find_property(props, name)?;
    let value = value_of(prop)?;
    expect_field(name, value, "type", Some("object"))?;
    expect_flag(name, value, "isValueType", false)?;
    expect_field(name, value, "className", Some(class_name))?;

    let has_null_subtype = value.subtype() == Some("null");
    if has_null_subtype != is_null {
        return Err(HarnessError::mismatch(
            name,
            "null subtype didn't match",
            is_null,
            has_null_subtype,
        ));
    }
    if subtype.is_some() {
        expect_field(name, value, "subtype", subtype)?;
    }
    Ok(prop)
}

pub fn check_value_type<'p>(
    props: &'p [PropertyDescriptor],
    name: &str,
    class_name: &str,
) -> HarnessResult<&'p PropertyDescriptor> {
    let prop = find_property(props, name)?;
    let value = value_of(prop)?;
    expect_field(name, value, "type", Some("object"))?;
    expect_flag(name, value, "isValueType", true)?;
    expect_field(name, value, "className", Some(class_name))?;
    Ok(prop)
}

pub fn check_enum<'p>(
    props: &'p [PropertyDescriptor],
    name: &str,
    class_name: &str,
    description: &str,
) -> HarnessResult<&'p PropertyDescriptor> {
    let prop = find_property(props, name)?;
    let value = value_of(prop)?;
    expect_field(name, value, "type", Some("object"))?;
    expect_flag(name, value, "isEnum", true)?;
    expect_field(name, value, "className", Some(class_name))?;
    expect_field(name, value, "description", Some(description))?;
    Ok(prop)
}

/// Shape only; elements are left to the matcher
pub fn check_array(props: &[PropertyDescriptor], name: &str, class_name: &str) -> HarnessResult<()> {
    let value = value_of(find_property(props, name)?)?;
    expect_field(name, value, "type", Some("object"))?;
    expect_field(name, value, "subtype", Some("array"))?;
    expect_field(name, value, "className", Some(class_name))
}

pub fn check_function(
    props: &[PropertyDescriptor],
    name: &str,
    description: &str,
    subtype: Option<&str>,
) -> HarnessResult<()> {
    let value = value_of(find_property(props, name)?)?;
    expect_field(name, value, "type", Some("function"))?;
    expect_field(name, value, "description", Some(description))?;
    expect_field(name, value, "subtype", subtype)
}

/// The `value` field of a single remote value, as a string
pub fn check_content_value(value: &RemoteObject, expected: &str) -> HarnessResult<()> {
    expect_field("content", value, "value", Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn locals() -> Vec<PropertyDescriptor> {
        serde_json::from_value(json!([
            {"name": "i", "value": {"type": "number", "value": 42}},
            {"name": "s", "value": {"type": "string", "value": "hello"}},
            {"name": "ns", "value": {"type": "object", "subtype": "null", "className": "string"}},
            {"name": "b", "value": {"type": "boolean", "value": true}},
            {"name": "dt", "value": {"type": "object", "className": "System.DateTime",
                                     "isValueType": true, "objectId": "dotnet:valuetype:0"}},
            {"name": "list", "value": {"type": "object", "className": "Math.GenericStruct<int>",
                                       "objectId": "dotnet:object:1"}},
            {"name": "nobj", "value": {"type": "object", "subtype": "null", "className": "Math"}},
            {"name": "kind", "value": {"type": "object", "className": "RGB", "isEnum": true,
                                       "description": "Red"}},
            {"name": "arr", "value": {"type": "object", "subtype": "array", "className": "int[]",
                                      "objectId": "dotnet:array:0"}},
            {"name": "f", "value": {"type": "function", "description": "int Add(int, int)"}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_scalar_checks() {
        let locals = locals();
        check_number(&locals, "i", 42).unwrap();
        assert!(check_number(&locals, "i", 41).is_err());
        assert!(check_number(&locals, "s", 0).is_err());

        check_string(&locals, "s", Some("hello")).unwrap();
        check_string(&locals, "ns", None).unwrap();
        assert!(check_string(&locals, "s", None).is_err());

        check_bool(&locals, "b", true).unwrap();
        assert!(check_bool(&locals, "b", false).is_err());
    }

    #[test]
    fn test_object_checks() {
        let locals = locals();
        check_object(&locals, "list", "Math.GenericStruct<int>", None, false).unwrap();
        check_object(&locals, "nobj", "Math", None, true).unwrap();
        assert!(check_object(&locals, "nobj", "Math", None, false).is_err());
        // value types are not plain objects
        assert!(check_object(&locals, "dt", "System.DateTime", None, false).is_err());

        let dt = check_value_type(&locals, "dt", "System.DateTime").unwrap();
        assert_eq!(dt.value.as_ref().unwrap().object_id(), Some("dotnet:valuetype:0"));
        assert!(check_value_type(&locals, "list", "Math.GenericStruct<int>").is_err());

        check_enum(&locals, "kind", "RGB", "Red").unwrap();
        assert!(check_enum(&locals, "kind", "RGB", "Blue").is_err());

        check_array(&locals, "arr", "int[]").unwrap();
        assert!(check_array(&locals, "list", "int[]").is_err());
    }

    #[test]
    fn test_function_check_is_exact_on_subtype() {
        let locals = locals();
        check_function(&locals, "f", "int Add(int, int)", None).unwrap();
        assert!(check_function(&locals, "f", "int Add(int, int)", Some("method")).is_err());
    }

    #[test]
    fn test_missing_variable() {
        let err = check_number(&locals(), "missing", 1).unwrap_err();
        assert!(err.to_string().contains("could not find variable 'missing'"));
        assert!(err.is_assertion_failure());
    }

    #[test]
    fn test_content_value() {
        let value: RemoteObject =
            serde_json::from_value(json!({"type": "string", "value": "1/2/2020"})).unwrap();
        check_content_value(&value, "1/2/2020").unwrap();
        assert!(check_content_value(&value, "2/1/2020").is_err());
    }
}

use super::*;
use crate::handler::ValueType;
use crate::media::MediaType;
use serde_json::json;

fn mt(s: &str) -> MediaType {
    MediaType::parse(s).unwrap()
}

#[test]
fn test_string_converter_reads_any_content_type_for_strings() {
    let converter = StringMessageConverter::new();
    assert!(converter.can_read(&ValueType::String, Some(&mt("text/plain"))));
    assert!(converter.can_read(&ValueType::String, Some(&mt("application/xml"))));
    assert!(converter.can_read(&ValueType::optional(ValueType::String), None));
    assert!(!converter.can_read(&ValueType::Json, Some(&mt("text/plain"))));
    let value = converter
        .read(&ValueType::String, b"hello", Some(&mt("text/plain;charset=UTF-8")))
        .unwrap();
    assert_eq!(value, json!("hello"));
    assert!(converter
        .read(&ValueType::String, b"hello", Some(&mt("text/plain;charset=latin1")))
        .is_err());
    assert!(converter.read(&ValueType::String, &[0xff, 0xfe], None).is_err());
}

#[test]
fn test_json_converter_media_types() {
    let converter = JsonMessageConverter::new();
    assert!(converter.can_read(&ValueType::Json, Some(&mt("application/json"))));
    assert!(converter.can_read(&ValueType::Json, Some(&mt("application/problem+json"))));
    assert!(!converter.can_read(&ValueType::Json, Some(&mt("application/xml"))));
    assert!(!converter.can_read(&ValueType::Headers, None));
    assert!(converter.can_write(&ValueType::Json, Some(&mt("*/*"))));
    assert!(converter.can_write(&ValueType::Json, Some(&mt("application/*"))));
    assert!(!converter.can_write(&ValueType::Json, Some(&mt("text/plain"))));
}

#[test]
fn test_json_converter_checks_declared_type() {
    let converter = JsonMessageConverter::new();
    let json_type = Some(&MediaType::application_json());
    assert_eq!(
        converter.read(&ValueType::Integer, b"42", None).unwrap(),
        json!(42)
    );
    assert!(converter.read(&ValueType::Integer, b"\"x\"", json_type).is_err());
    assert!(converter
        .read(&ValueType::list(ValueType::Integer), b"[1, 2, 3]", json_type)
        .is_ok());
    assert!(converter
        .read(&ValueType::list(ValueType::Integer), b"[1, \"two\"]", json_type)
        .is_err());
    assert!(converter.read(&ValueType::Json, b"{not json", json_type).is_err());
}

#[test]
fn test_write() {
    let string = StringMessageConverter::new();
    assert_eq!(string.write(&json!("plain"), &MediaType::text_plain()).unwrap(), b"plain");
    let json = JsonMessageConverter::new();
    assert_eq!(
        json.write(&json!({"id": 1}), &MediaType::application_json()).unwrap(),
        br#"{"id":1}"#
    );
}

#[test]
fn test_default_converter_order() {
    let names: Vec<String> = default_converters().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["StringMessageConverter", "JsonMessageConverter"]);
}

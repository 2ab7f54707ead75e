//! Preprocess normalization and schema introspection at the transform level

mod common;

use common::MockRuntime;
use serde_json::json;
use std::sync::Arc;
use talon::entity::{Entity, EntityKind, FieldType, RawInput};
use talon::tool::{Shodan, SecretStore, Subfinder};
use talon::transform::{DomainSubdomains, IpToAsn, Transform};

fn domain_transform() -> DomainSubdomains {
    let runtime = Arc::new(MockRuntime::unreachable());
    DomainSubdomains::new(Arc::new(Subfinder::new(runtime)))
}

#[test]
fn test_preprocess_accepts_mixed_shapes_in_order() {
    let transform = domain_transform();
    let raw: Vec<RawInput> = vec![
        RawInput::from(
            Entity::from_primitive(EntityKind::Domain, &json!("alliage.io")).unwrap(),
        ),
        json!({"name": "inria.fr", "registrar": "AFNIC"}).into(),
        "ovh.com".into(),
    ];

    let entities = transform.preprocess(&raw);
    let names: Vec<String> = entities.iter().map(|e| e.identifying_value()).collect();
    assert_eq!(names, vec!["alliage.io", "inria.fr", "ovh.com"]);
}

#[test]
fn test_preprocess_silently_drops_invalid_elements() {
    let transform = domain_transform();
    let raw: Vec<RawInput> = vec![
        "not a domain".into(),
        json!({"registrar": "AFNIC"}).into(),
        json!(42).into(),
        json!([1, 2]).into(),
        "ovh.com".into(),
        "".into(),
    ];

    let entities = transform.preprocess(&raw);
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].identifying_value(), "ovh.com");
}

#[test]
fn test_preprocess_keeps_input_duplicates() {
    let transform = domain_transform();
    let raw: Vec<RawInput> = vec!["ovh.com".into(), "ovh.com".into()];
    assert_eq!(transform.preprocess(&raw).len(), 2);
}

#[test]
fn test_preprocess_is_deterministic() {
    let transform = domain_transform();
    let raw: Vec<RawInput> = vec!["ovh.com".into(), "junk value".into(), "inria.fr".into()];
    assert_eq!(transform.preprocess(&raw), transform.preprocess(&raw));
}

#[test]
fn test_schemas_need_no_lifecycle_call() {
    let runtime = Arc::new(MockRuntime::unreachable());
    let transform = IpToAsn::new(Arc::new(Shodan::new(runtime, SecretStore::default())));

    let input = transform.input_schema();
    assert_eq!(input[0].name, "address");
    assert!(input[0].required);
    assert_eq!(input[0].field_type, FieldType::String);

    let output = transform.output_schema();
    assert_eq!(output[0].name, "number");
    assert!(output[0].required);
    assert_eq!(output[0].field_type, FieldType::Integer);
    assert!(output.iter().skip(1).all(|f| !f.required));
}

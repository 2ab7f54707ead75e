//! Typed entity model for investigation graphs
//!
//! This module provides:
//! - The closed set of entity types (ASN, IP, domain, organization, ...)
//! - Coercion of loosely-typed raw input (typed instance, mapping, or bare
//!   primitive) into validated entities
//! - Static schema introspection for each entity type
//!
//! Entities are immutable once constructed; enrichment produces new
//! entities, never updates.

mod schema;

pub use schema::{FieldDescriptor, FieldType};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::sync::OnceLock;

/// An autonomous system observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asn {
    /// AS number (identifying field)
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An IP address observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ip {
    /// Address in dotted-quad or RFC 5952 form (identifying field)
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A DNS domain observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Fully qualified domain name (identifying field)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An organization observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name (identifying field)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A social media profile observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    /// Username on the platform (identifying field)
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A document observation (leaked file, indexed paste, public report)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document URL (identifying field)
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An email address observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Email address (identifying field)
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A person-to-organization affiliation observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    /// Subject name (identifying field)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An alias / handle observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    /// Alias value (identifying field)
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A DNS record observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record value, e.g. the pointed-to host or address (identifying field)
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One typed, validated observation in the investigation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Asn(Asn),
    Ip(Ip),
    Domain(Domain),
    Organization(Organization),
    SocialProfile(SocialProfile),
    Document(Document),
    Email(Email),
    Affiliation(Affiliation),
    Alias(Alias),
    DnsRecord(DnsRecord),
}

/// Discriminant for entity types; used for schema introspection and
/// transform input/output contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Asn,
    Ip,
    Domain,
    Organization,
    SocialProfile,
    Document,
    Email,
    Affiliation,
    Alias,
    DnsRecord,
}

impl EntityKind {
    /// Name of the single required identifying field for this kind
    pub fn identifying_field(&self) -> &'static str {
        match self {
            EntityKind::Asn => "number",
            EntityKind::Ip => "address",
            EntityKind::Domain => "name",
            EntityKind::Organization => "name",
            EntityKind::SocialProfile => "username",
            EntityKind::Document => "url",
            EntityKind::Email => "address",
            EntityKind::Affiliation => "name",
            EntityKind::Alias => "value",
            EntityKind::DnsRecord => "value",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Asn => "asn",
            EntityKind::Ip => "ip",
            EntityKind::Domain => "domain",
            EntityKind::Organization => "organization",
            EntityKind::SocialProfile => "social_profile",
            EntityKind::Document => "document",
            EntityKind::Email => "email",
            EntityKind::Affiliation => "affiliation",
            EntityKind::Alias => "alias",
            EntityKind::DnsRecord => "dns_record",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn domain_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
            .unwrap()
    })
}

fn email_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Asn(_) => EntityKind::Asn,
            Entity::Ip(_) => EntityKind::Ip,
            Entity::Domain(_) => EntityKind::Domain,
            Entity::Organization(_) => EntityKind::Organization,
            Entity::SocialProfile(_) => EntityKind::SocialProfile,
            Entity::Document(_) => EntityKind::Document,
            Entity::Email(_) => EntityKind::Email,
            Entity::Affiliation(_) => EntityKind::Affiliation,
            Entity::Alias(_) => EntityKind::Alias,
            Entity::DnsRecord(_) => EntityKind::DnsRecord,
        }
    }

    /// Value of the identifying field, rendered as a string.
    ///
    /// Two entities of the same kind with equal identifying values are
    /// treated as the same real-world observation.
    pub fn identifying_value(&self) -> String {
        match self {
            Entity::Asn(e) => e.number.to_string(),
            Entity::Ip(e) => e.address.clone(),
            Entity::Domain(e) => e.name.clone(),
            Entity::Organization(e) => e.name.clone(),
            Entity::SocialProfile(e) => e.username.clone(),
            Entity::Document(e) => e.url.clone(),
            Entity::Email(e) => e.address.clone(),
            Entity::Affiliation(e) => e.name.clone(),
            Entity::Alias(e) => e.value.clone(),
            Entity::DnsRecord(e) => e.value.clone(),
        }
    }

    /// Check the identifying value against kind-specific format rules
    pub fn is_valid(&self) -> bool {
        match self {
            // serde already bounds the number to u32; any parsed ASN is valid
            Entity::Asn(_) => true,
            Entity::Ip(e) => e.address.parse::<IpAddr>().is_ok(),
            Entity::Domain(e) => domain_regex().is_match(e.name.trim()),
            Entity::Organization(e) => !e.name.trim().is_empty(),
            Entity::SocialProfile(e) => !e.username.trim().is_empty(),
            Entity::Document(e) => !e.url.trim().is_empty(),
            Entity::Email(e) => email_regex().is_match(e.address.trim()),
            Entity::Affiliation(e) => !e.name.trim().is_empty(),
            Entity::Alias(e) => !e.value.trim().is_empty(),
            Entity::DnsRecord(e) => !e.value.trim().is_empty(),
        }
    }

    /// Trim surrounding whitespace off the identifying value so that
    /// `" ovh.com "` and `"ovh.com"` share one dedup key
    fn normalized(mut self) -> Self {
        fn trim_in_place(s: &mut String) {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
        match &mut self {
            Entity::Asn(_) => {}
            Entity::Ip(e) => trim_in_place(&mut e.address),
            Entity::Domain(e) => trim_in_place(&mut e.name),
            Entity::Organization(e) => trim_in_place(&mut e.name),
            Entity::SocialProfile(e) => trim_in_place(&mut e.username),
            Entity::Document(e) => trim_in_place(&mut e.url),
            Entity::Email(e) => trim_in_place(&mut e.address),
            Entity::Affiliation(e) => trim_in_place(&mut e.name),
            Entity::Alias(e) => trim_in_place(&mut e.value),
            Entity::DnsRecord(e) => trim_in_place(&mut e.value),
        }
        self
    }

    /// Attach a provenance source, producing a new entity
    pub fn with_source(mut self, src: &str) -> Self {
        let slot = match &mut self {
            Entity::Asn(e) => &mut e.source,
            Entity::Ip(e) => &mut e.source,
            Entity::Domain(e) => &mut e.source,
            Entity::Organization(e) => &mut e.source,
            Entity::SocialProfile(e) => &mut e.source,
            Entity::Document(e) => &mut e.source,
            Entity::Email(e) => &mut e.source,
            Entity::Affiliation(e) => &mut e.source,
            Entity::Alias(e) => &mut e.source,
            Entity::DnsRecord(e) => &mut e.source,
        };
        *slot = Some(src.to_string());
        self
    }

    /// Construct an entity of `kind` from a JSON mapping.
    ///
    /// The mapping must contain the identifying field; unrecognized keys are
    /// ignored. Returns `None` when the shape or identifying value is
    /// unusable.
    pub fn from_map(kind: EntityKind, map: &Map<String, Value>) -> Option<Entity> {
        // Route through serde with the kind tag injected; unknown keys are
        // ignored by default and missing optional fields default to None.
        let mut tagged = map.clone();
        tagged.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        let entity: Entity = serde_json::from_value(Value::Object(tagged)).ok()?;
        let entity = entity.normalized();
        entity.is_valid().then_some(entity)
    }

    /// Construct an entity of `kind` from a bare primitive assigned to the
    /// identifying field
    pub fn from_primitive(kind: EntityKind, value: &Value) -> Option<Entity> {
        let mut map = Map::new();
        map.insert(kind.identifying_field().to_string(), value.clone());
        Entity::from_map(kind, &map)
    }
}

/// One element of the loosely-typed input collection handed to preprocess.
///
/// The accepted shapes are a closed set: an already-typed entity, a JSON
/// mapping, or a bare primitive. Anything else is rejected during coercion.
#[derive(Debug, Clone)]
pub enum RawInput {
    Entity(Entity),
    Value(Value),
}

impl From<Entity> for RawInput {
    fn from(e: Entity) -> Self {
        RawInput::Entity(e)
    }
}

impl From<Value> for RawInput {
    fn from(v: Value) -> Self {
        RawInput::Value(v)
    }
}

impl From<&str> for RawInput {
    fn from(s: &str) -> Self {
        RawInput::Value(Value::String(s.to_string()))
    }
}

impl From<String> for RawInput {
    fn from(s: String) -> Self {
        RawInput::Value(Value::String(s))
    }
}

impl From<u64> for RawInput {
    fn from(n: u64) -> Self {
        RawInput::Value(Value::from(n))
    }
}

impl From<i64> for RawInput {
    fn from(n: i64) -> Self {
        RawInput::Value(Value::from(n))
    }
}

impl RawInput {
    /// Try to coerce this raw element into an entity of `kind`.
    ///
    /// Pure and infallible in the panicking sense: malformed shapes yield
    /// `None`, never an error.
    pub fn coerce(&self, kind: EntityKind) -> Option<Entity> {
        match self {
            RawInput::Entity(e) => {
                if e.kind() != kind {
                    return None;
                }
                let e = e.clone().normalized();
                e.is_valid().then_some(e)
            }
            RawInput::Value(Value::Object(map)) => Entity::from_map(kind, map),
            RawInput::Value(v @ Value::String(_)) | RawInput::Value(v @ Value::Number(_)) => {
                Entity::from_primitive(kind, v)
            }
            RawInput::Value(_) => None,
        }
    }
}

/// Coerce a whole raw collection, silently dropping invalid elements and
/// preserving the relative order of valid ones
pub fn coerce_all(raw: &[RawInput], kind: EntityKind) -> Vec<Entity> {
    raw.iter().filter_map(|r| r.coerce(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_shapes_coerce_in_order() {
        let raw: Vec<RawInput> = vec![
            Entity::Organization(Organization {
                name: "OpenAI".to_string(),
                website: None,
                country: None,
                industry: None,
                confidence: None,
                source: None,
            })
            .into(),
            json!({"name": "Inria"}).into(),
            "OVH".into(),
        ];

        let entities = coerce_all(&raw, EntityKind::Organization);
        assert_eq!(entities.len(), 3);
        let names: Vec<String> = entities.iter().map(|e| e.identifying_value()).collect();
        assert_eq!(names, vec!["OpenAI", "Inria", "OVH"]);
    }

    #[test]
    fn test_asn_range_validation() {
        let raw: Vec<RawInput> = vec![
            json!({"number": 15169}).into(),
            json!({"number": 999999999999u64}).into(),
            json!({"number": 13335}).into(),
        ];

        let entities = coerce_all(&raw, EntityKind::Asn);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].identifying_value(), "15169");
        assert_eq!(entities[1].identifying_value(), "13335");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let raw: Vec<RawInput> = vec![json!({"name": "inria.fr", "bogus": true}).into()];
        let entities = coerce_all(&raw, EntityKind::Domain);
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn test_missing_identifying_field_dropped() {
        let raw: Vec<RawInput> = vec![json!({"website": "https://ovh.com"}).into()];
        assert!(coerce_all(&raw, EntityKind::Organization).is_empty());
    }

    #[test]
    fn test_blank_identifying_value_dropped() {
        let raw: Vec<RawInput> = vec!["   ".into(), "".into()];
        assert!(coerce_all(&raw, EntityKind::Organization).is_empty());
    }

    #[test]
    fn test_invalid_ip_dropped() {
        let raw: Vec<RawInput> = vec!["999.1.2.3".into(), "192.168.1.1".into(), "::1".into()];
        let entities = coerce_all(&raw, EntityKind::Ip);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_wrong_kind_entity_dropped() {
        let ip = Entity::Ip(Ip {
            address: "10.0.0.1".to_string(),
            version: None,
            asn: None,
            hostname: None,
            confidence: None,
            source: None,
        });
        let raw: Vec<RawInput> = vec![ip.into()];
        assert!(coerce_all(&raw, EntityKind::Domain).is_empty());
    }

    #[test]
    fn test_non_coercible_json_shapes_dropped() {
        let raw: Vec<RawInput> = vec![
            json!([1, 2, 3]).into(),
            json!(true).into(),
            Value::Null.into(),
        ];
        assert!(coerce_all(&raw, EntityKind::Alias).is_empty());
    }

    #[test]
    fn test_email_format() {
        let raw: Vec<RawInput> = vec!["not-an-email".into(), "a@b.io".into()];
        let entities = coerce_all(&raw, EntityKind::Email);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].identifying_value(), "a@b.io");
    }

    #[test]
    fn test_identifying_value_trimmed_on_coercion() {
        let raw: Vec<RawInput> = vec![" ovh.com ".into(), "ovh.com".into()];
        let entities = coerce_all(&raw, EntityKind::Domain);
        assert_eq!(entities.len(), 2);
        // Both spellings end up with the same dedup key
        assert_eq!(entities[0].identifying_value(), "ovh.com");
        assert_eq!(entities[0].identifying_value(), entities[1].identifying_value());
    }

    #[test]
    fn test_typed_entity_trimmed_on_coercion() {
        let padded = Entity::Organization(Organization {
            name: "  Inria  ".to_string(),
            website: None,
            country: None,
            industry: None,
            confidence: None,
            source: None,
        });
        let raw: Vec<RawInput> = vec![padded.into()];
        let entities = coerce_all(&raw, EntityKind::Organization);
        assert_eq!(entities[0].identifying_value(), "Inria");
    }

    #[test]
    fn test_padded_ip_trimmed_and_accepted() {
        let raw: Vec<RawInput> = vec![" 192.168.1.1 ".into()];
        let entities = coerce_all(&raw, EntityKind::Ip);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].identifying_value(), "192.168.1.1");
    }

    #[test]
    fn test_with_source_is_a_new_entity() {
        let base = Entity::from_primitive(EntityKind::Domain, &json!("ovh.com")).unwrap();
        let tagged = base.clone().with_source("subfinder");
        assert_ne!(base, tagged);
        assert_eq!(base.identifying_value(), tagged.identifying_value());
    }
}

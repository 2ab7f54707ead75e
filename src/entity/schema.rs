//! Static schema introspection for entity types
//!
//! Field descriptors are derived from the declared shape of each entity
//! type alone; no instance, I/O, or prior lifecycle call is needed. A flow
//! editor uses them to render and validate a transform's input/output
//! contract.

use crate::entity::EntityKind;
use serde::Serialize;

/// Primitive type of one entity field, as exposed to schema consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

/// Descriptor for one declared entity field.
///
/// Derived from the type's declared shape; used for introspection only,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub description: &'static str,
}

const fn field(
    name: &'static str,
    field_type: FieldType,
    required: bool,
    description: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        field_type,
        required,
        description,
    }
}

// Shared provenance trailer present on every entity type
const CONFIDENCE: FieldDescriptor = field(
    "confidence",
    FieldType::Float,
    false,
    "Confidence score between 0.0 and 1.0",
);
const SOURCE: FieldDescriptor = field(
    "source",
    FieldType::String,
    false,
    "Provenance: tool or input that produced this observation",
);

impl EntityKind {
    /// One descriptor per declared field, in declaration order.
    ///
    /// The identifying field is always first and always required.
    pub fn schema(&self) -> Vec<FieldDescriptor> {
        match self {
            EntityKind::Asn => vec![
                field("number", FieldType::Integer, true, "AS number"),
                field("name", FieldType::String, false, "AS holder name"),
                field("country", FieldType::String, false, "Registration country"),
                field("registry", FieldType::String, false, "Regional registry"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Ip => vec![
                field("address", FieldType::String, true, "IPv4 or IPv6 address"),
                field("version", FieldType::String, false, "IP version (4 or 6)"),
                field("asn", FieldType::Integer, false, "Announcing AS number"),
                field("hostname", FieldType::String, false, "Reverse DNS hostname"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Domain => vec![
                field("name", FieldType::String, true, "Fully qualified domain name"),
                field("registrar", FieldType::String, false, "Sponsoring registrar"),
                field("resolved_ip", FieldType::String, false, "Resolved address"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Organization => vec![
                field("name", FieldType::String, true, "Organization name"),
                field("website", FieldType::String, false, "Primary website"),
                field("country", FieldType::String, false, "Country of operation"),
                field("industry", FieldType::String, false, "Industry sector"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::SocialProfile => vec![
                field("username", FieldType::String, true, "Username on the platform"),
                field("platform", FieldType::String, false, "Platform name"),
                field("url", FieldType::String, false, "Profile URL"),
                field("full_name", FieldType::String, false, "Display name"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Document => vec![
                field("url", FieldType::String, true, "Document URL"),
                field("title", FieldType::String, false, "Document title"),
                field("mime_type", FieldType::String, false, "MIME type"),
                field("sha256", FieldType::String, false, "Content hash"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Email => vec![
                field("address", FieldType::String, true, "Email address"),
                field("domain", FieldType::String, false, "Mail domain"),
                field("breached", FieldType::Boolean, false, "Seen in a known breach"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Affiliation => vec![
                field("name", FieldType::String, true, "Subject name"),
                field("organization", FieldType::String, false, "Affiliated organization"),
                field("role", FieldType::String, false, "Role within the organization"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::Alias => vec![
                field("value", FieldType::String, true, "Alias or handle"),
                field("context", FieldType::String, false, "Where the alias was seen"),
                CONFIDENCE,
                SOURCE,
            ],
            EntityKind::DnsRecord => vec![
                field("value", FieldType::String, true, "Record value"),
                field("record_type", FieldType::String, false, "Record type (A, MX, ...)"),
                field("ttl", FieldType::Integer, false, "Time to live in seconds"),
                field("domain", FieldType::String, false, "Owning domain"),
                CONFIDENCE,
                SOURCE,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifying_field_first_and_required() {
        for kind in [
            EntityKind::Asn,
            EntityKind::Ip,
            EntityKind::Domain,
            EntityKind::Organization,
            EntityKind::SocialProfile,
            EntityKind::Document,
            EntityKind::Email,
            EntityKind::Affiliation,
            EntityKind::Alias,
            EntityKind::DnsRecord,
        ] {
            let schema = kind.schema();
            assert_eq!(schema[0].name, kind.identifying_field(), "{kind}");
            assert!(schema[0].required, "{kind}");
            // Only the identifying field is required
            assert!(schema.iter().skip(1).all(|f| !f.required), "{kind}");
        }
    }

    #[test]
    fn test_schema_is_stable() {
        assert_eq!(EntityKind::Domain.schema(), EntityKind::Domain.schema());
    }

    #[test]
    fn test_asn_number_is_integer() {
        let schema = EntityKind::Asn.schema();
        assert_eq!(schema[0].field_type, FieldType::Integer);
    }

    #[test]
    fn test_serializes_with_type_key() {
        let schema = EntityKind::Alias.schema();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json[0]["type"], "string");
        assert_eq!(json[0]["required"], true);
    }
}

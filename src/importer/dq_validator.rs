// ==========================================
// Registry Ingest - data quality validator
// ==========================================
// Identifier shapes, required fields, length caps, allowed values.
// Every failure is a per-row RejectReason, never a fatal error.
// ==========================================

use crate::domain::types::KeyFormat;
use crate::importer::error::RejectReason;
use crate::importer::ingest_trait::DqValidator as DqValidatorTrait;
use crate::registry::{FieldSpec, Presence};

/// `dddd.ddd.ddd`
const ENTERPRISE_GROUPS: &[usize] = &[4, 3, 3];
/// `2.ddd.ddd.ddd`
const ESTABLISHMENT_GROUPS: &[usize] = &[1, 3, 3, 3];

pub struct DqValidator;

/// Dot-separated groups of ASCII digits with the given widths.
fn matches_digit_groups(value: &str, widths: &[usize]) -> bool {
    let groups: Vec<&str> = value.split('.').collect();
    groups.len() == widths.len()
        && groups
            .iter()
            .zip(widths)
            .all(|(group, width)| group.len() == *width && group.bytes().all(|b| b.is_ascii_digit()))
}

pub fn is_enterprise_number(value: &str) -> bool {
    matches_digit_groups(value, ENTERPRISE_GROUPS)
}

pub fn is_establishment_number(value: &str) -> bool {
    value.starts_with('2') && matches_digit_groups(value, ESTABLISHMENT_GROUPS)
}

impl DqValidatorTrait for DqValidator {
    fn validate_key_format(
        &self,
        field: &FieldSpec,
        format: KeyFormat,
        value: &str,
    ) -> Result<(), RejectReason> {
        let (ok, expected) = match format {
            KeyFormat::Free => return Ok(()),
            KeyFormat::EnterpriseNumber => (is_enterprise_number(value), "dddd.ddd.ddd"),
            KeyFormat::EstablishmentNumber => (is_establishment_number(value), "2.ddd.ddd.ddd"),
            KeyFormat::EntityNumber => (
                is_enterprise_number(value) || is_establishment_number(value),
                "dddd.ddd.ddd or 2.ddd.ddd.ddd",
            ),
        };

        if ok {
            Ok(())
        } else {
            Err(RejectReason::MalformedValue {
                field: field.header.to_string(),
                detail: format!("{:?} does not match {}", value, expected),
            })
        }
    }

    fn validate_field(&self, field: &FieldSpec, value: Option<&str>) -> Result<(), RejectReason> {
        let value = match (value, field.presence) {
            (Some(v), _) => v,
            (None, Presence::Optional) => return Ok(()),
            (None, Presence::Key) => {
                return Err(RejectReason::MissingKey {
                    field: field.header.to_string(),
                })
            }
            (None, Presence::Required) => {
                return Err(RejectReason::MalformedValue {
                    field: field.header.to_string(),
                    detail: "required value is empty".to_string(),
                })
            }
        };

        if let Some(max) = field.max_len {
            let len = value.chars().count();
            if len > max {
                return Err(match field.presence {
                    Presence::Key => RejectReason::KeyTooLong {
                        field: field.header.to_string(),
                        len,
                        max,
                    },
                    _ => RejectReason::MalformedValue {
                        field: field.header.to_string(),
                        detail: format!("{} characters exceeds {}", len, max),
                    },
                });
            }
        }

        if let Some(allowed) = field.allowed {
            if !allowed.contains(&value) {
                return Err(RejectReason::MalformedValue {
                    field: field.header.to_string(),
                    detail: format!("{:?} not in {:?}", value, allowed),
                });
            }
        }

        Ok(())
    }
}

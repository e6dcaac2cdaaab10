// ✅ Record Validator - key check, integer coercion, rejection records
//
// Everything here is pure: no store, no publisher. The reconciler decides
// what to do with the results.

use crate::player::{ColumnKind, Player, PlayerField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// REJECT REASONS & COERCION NOTES
// ============================================================================

/// Why a row never reached (or failed to reach) the store
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("row has no key column")]
    MissingKey,

    #[error("key is blank")]
    BlankKey,

    #[error("row has {found} fields, expected {expected}")]
    TooFewFields { found: usize, expected: usize },

    #[error("store error: {0}")]
    Store(String),
}

/// A numeric field that could not be parsed and was left absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionNote {
    pub field: String,
    pub value: String,
}

impl std::fmt::Display for CoercionNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: cannot parse '{}' as integer", self.field, self.value)
    }
}

// ============================================================================
// KEY VALIDATION
// ============================================================================

/// Return the row's key if it is present and not blank after trimming.
///
/// The key is returned untrimmed: the deletion sweep compares raw column-0
/// values, so the stored key has to be the raw value too.
pub fn validate_key(row: &[String]) -> Result<&str, RejectReason> {
    match row.first() {
        None => Err(RejectReason::MissingKey),
        Some(key) if key.trim().is_empty() => Err(RejectReason::BlankKey),
        Some(key) => Ok(key.as_str()),
    }
}

// ============================================================================
// FIELD POPULATION
// ============================================================================

/// Integer coercion for one numeric column
///
/// - empty → `Ok(None)`
/// - unparsable → `Err(note)`; caller stores `None`
/// - otherwise → `Ok(Some(value))`
pub fn coerce_integer(field: PlayerField, raw: &str) -> Result<Option<i32>, CoercionNote> {
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<i32>().map(Some).map_err(|_| CoercionNote {
        field: field.name().to_string(),
        value: raw.to_string(),
    })
}

/// Copy every non-key column of `row` onto `player`.
///
/// Fails only when the row is too short to hold the full schema. Coercion
/// problems never fail the row; they come back as notes.
pub fn populate(player: &mut Player, row: &[String]) -> Result<Vec<CoercionNote>, RejectReason> {
    if row.len() < PlayerField::COUNT {
        return Err(RejectReason::TooFewFields {
            found: row.len(),
            expected: PlayerField::COUNT,
        });
    }

    let mut notes = Vec::new();

    for field in PlayerField::ALL {
        let raw = &row[field.index()];
        match field.kind() {
            // Key is stamped by the caller before population
            ColumnKind::Key => {}
            ColumnKind::Integer => {
                let value = coerce_integer(field, raw).unwrap_or_else(|note| {
                    notes.push(note);
                    None
                });
                if let Some(slot) = player.integer_mut(field) {
                    *slot = value;
                }
            }
            ColumnKind::Text => {
                if let Some(slot) = player.text_mut(field) {
                    slot.clone_from(raw);
                }
            }
        }
    }

    Ok(notes)
}

// ============================================================================
// REJECTION RECORDS
// ============================================================================

/// All 24 named fields of a raw row, no coercion, in column order.
/// Missing trailing fields come out as empty strings.
pub fn rejection_record(row: &[String]) -> Map<String, Value> {
    PlayerField::ALL
        .iter()
        .map(|field| {
            let raw = row.get(field.index()).cloned().unwrap_or_default();
            (field.name().to_string(), Value::String(raw))
        })
        .collect()
}

/// Message published on the rejection channel
pub fn render_rejection(row: &[String]) -> String {
    Value::Object(rejection_record(row)).to_string()
}

// ============================================================================
// HEADER CHECK
// ============================================================================

/// Compare a snapshot header against the column table.
///
/// Returns one description per mismatching position; empty means aligned.
pub fn check_header(header: &[String]) -> Vec<String> {
    let mut mismatches = Vec::new();

    for field in PlayerField::ALL {
        match header.get(field.index()) {
            None => mismatches.push(format!(
                "column {} ({}) missing from header",
                field.index(),
                field.name()
            )),
            Some(found) if PlayerField::from_name(found) != Some(field) => {
                mismatches.push(format!(
                    "column {}: expected '{}', found '{}'",
                    field.index(),
                    field.name(),
                    found
                ))
            }
            Some(_) => {}
        }
    }

    if header.len() > PlayerField::COUNT {
        mismatches.push(format!(
            "header has {} extra column(s)",
            header.len() - PlayerField::COUNT
        ));
    }

    mismatches
}

// ============================================================================
// TESTS
// ============================================================================

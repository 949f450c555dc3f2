//! Filas remotas → entidades tipadas.
//!
//! Las columnas JSON de pasos y notas pueden traer la forma vieja (objetos)
//! o la nueva (texto); se normalizan aquí con las mismas reglas que la vista
//! de procedimiento.

use autotech_domain::{Feedback, LinkedProcedure, ToolGuide, Variant};
use serde_json::Value;

use super::client::{text, Row};
use crate::display::{normalize_notes, normalize_steps};
use crate::CoreError;

fn opt_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn variant(row: &Row) -> Variant {
    Variant { id: text(row, "id"),
              procedure_id: text(row, "procedure_id"),
              variant_name: text(row, "variant_name"),
              hardware_type: opt_text(row, "hardware_type"),
              notes: normalize_notes(row.get("notes")) }
}

pub fn tool_guide(row: &Row) -> ToolGuide {
    ToolGuide { id: text(row, "id"),
                variant_id: text(row, "variant_id"),
                tool_name: text(row, "tool_name"),
                steps: normalize_steps(row.get("steps")),
                notes: normalize_notes(row.get("notes")) }
}

pub fn link(row: &Row) -> LinkedProcedure {
    LinkedProcedure { id: text(row, "id"),
                      procedure_id: text(row, "procedure_id"),
                      linked_procedure_id: text(row, "linked_procedure_id"),
                      relationship: row.get("relationship")
                                       .and_then(Value::as_str)
                                       .and_then(|s| s.parse().ok())
                                       .unwrap_or_default() }
}

/// El feedback sí se decodifica estricto: una fila ilegible es un error de
/// almacenamiento, no algo que se muestre a medias.
pub fn feedback(row: Row) -> Result<Feedback, CoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

//! Variantes de hardware, guías por herramienta y enlaces entre procedimientos.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Rama de un procedimiento específica de un hardware (tipo de cluster,
/// EEPROM, ...). Las notas ya vienen normalizadas a texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub procedure_id: String,
    pub variant_name: String,
    #[serde(default)]
    pub hardware_type: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Secuencia de pasos para una herramienta concreta dentro de una variante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolGuide {
    pub id: String,
    pub variant_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Required,
    Recommended,
    Related,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Required => "required",
            Relationship::Recommended => "recommended",
            Relationship::Related => "related",
        }
    }
}

impl Default for Relationship {
    fn default() -> Self { Relationship::Related }
}

impl FromStr for Relationship {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Relationship::Required),
            "recommended" => Ok(Relationship::Recommended),
            "related" => Ok(Relationship::Related),
            other => Err(DomainError::UnknownValue { field: "relationship", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relación dirigida `procedure_id -> linked_procedure_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedProcedure {
    pub id: String,
    pub procedure_id: String,
    pub linked_procedure_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationship: Relationship,
}

// `relationship` es nullable en la tabla; null equivale a `related`.
fn null_as_default<'de, D>(de: D) -> Result<Relationship, D::Error>
    where D: serde::Deserializer<'de>
{
    Ok(Option::<Relationship>::deserialize(de)?.unwrap_or_default())
}

impl LinkedProcedure {
    /// Un procedimiento no puede enlazarse consigo mismo.
    pub fn check_endpoints(source: &str, target: &str) -> Result<(), DomainError> {
        if source == target {
            return Err(DomainError::validation("a procedure cannot be linked to itself"));
        }
        Ok(())
    }
}

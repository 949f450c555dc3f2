//! Procedimiento de servicio y sus piezas (herramientas, rango de costo).
//!
//! La forma serializada es la del catálogo local/exportado (camelCase):
//! `{id, category, title, description, timeMinutes, difficulty,
//! cost:{min,max}, tools, steps, notes?, pinCode?, chipType?}`.
//! El orden de `tools` y `steps` es significativo y se preserva tal cual.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Difficulty, DomainError, ServiceCategory};

/// Herramienta requerida u opcional para un procedimiento.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub required: bool,
}

impl Tool {
    pub fn required(name: &str) -> Self {
        Tool { name: name.to_string(), required: true }
    }
    pub fn optional(name: &str) -> Self {
        Tool { name: name.to_string(), required: false }
    }
}

/// Rango de costo en unidades enteras de moneda. Invariante: `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawCostRange")]
pub struct CostRange {
    min: u32,
    max: u32,
}

#[derive(Deserialize)]
struct RawCostRange {
    min: u32,
    max: u32,
}

impl TryFrom<RawCostRange> for CostRange {
    type Error = DomainError;
    fn try_from(raw: RawCostRange) -> Result<Self, Self::Error> {
        CostRange::new(raw.min, raw.max)
    }
}

impl CostRange {
    pub fn new(min: u32, max: u32) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::InvalidCostRange(format!("min {min} > max {max}")));
        }
        Ok(CostRange { min, max })
    }

    /// Construye el rango a partir de cotas opcionales.
    ///
    /// - Sin cotas: `0..0`.
    /// - Con una sola cota: la ausente toma el valor de la presente.
    /// - Cotas negativas o fuera de rango se rechazan.
    pub fn from_bounds(min: Option<i64>, max: Option<i64>) -> Result<Self, DomainError> {
        let (min, max) = match (min, max) {
            (None, None) => (0, 0),
            (Some(v), None) | (None, Some(v)) => (v, v),
            (Some(a), Some(b)) => (a, b),
        };
        CostRange::new(bound_to_u32(min)?, bound_to_u32(max)?)
    }

    pub fn min(&self) -> u32 { self.min }
    pub fn max(&self) -> u32 { self.max }
}

fn bound_to_u32(v: i64) -> Result<u32, DomainError> {
    u32::try_from(v).map_err(|_| DomainError::InvalidCostRange(format!("bound out of range: {v}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub id: String,
    pub category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub time_minutes: u32,
    pub difficulty: Difficulty,
    pub cost: CostRange,
    pub tools: Vec<Tool>,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_type: Option<String>,
}

impl Procedure {
    /// Valida reglas que el tipo no expresa por sí solo.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("procedure id is required"));
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("procedure title is required"));
        }
        Ok(())
    }

    pub fn notes(&self) -> &[String] {
        self.notes.as_deref().unwrap_or(&[])
    }
}

/// Borrador de procedimiento tal como llega de un formulario.
///
/// Categoría y dificultad viajan como texto y se validan en `into_procedure`,
/// que es la frontera de escritura.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcedureDraft {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub time_minutes: Option<i64>,
    pub cost_min: Option<i64>,
    pub cost_max: Option<i64>,
    pub tools: Vec<Tool>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    pub chip_type: Option<String>,
    pub pin_code: Option<String>,
}

impl ProcedureDraft {
    pub fn into_procedure(self) -> Result<Procedure, DomainError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        let category: ServiceCategory = self.category.trim().parse()?;
        let difficulty: Difficulty = self.difficulty.trim().parse()?;
        let time_minutes = match self.time_minutes {
            None => 0,
            Some(t) => u32::try_from(t).map_err(|_| DomainError::validation(format!("invalid time: {t}")))?,
        };
        let cost = CostRange::from_bounds(self.cost_min, self.cost_max)?;
        // Entradas en blanco del formulario se descartan; el orden se conserva.
        let tools: Vec<Tool> = self.tools
                                   .into_iter()
                                   .filter(|t| !t.name.trim().is_empty())
                                   .map(|t| Tool { name: t.name.trim().to_string(), required: t.required })
                                   .collect();
        let steps = non_blank(self.steps);
        let notes = non_blank(self.notes);
        let id = self.id
                     .filter(|s| !s.trim().is_empty())
                     .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(Procedure { id,
                       category,
                       title,
                       description: self.description.trim().to_string(),
                       time_minutes,
                       difficulty,
                       cost,
                       tools,
                       steps,
                       notes: if notes.is_empty() { None } else { Some(notes) },
                       pin_code: optional_text(self.pin_code),
                       chip_type: optional_text(self.chip_type) })
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items.into_iter()
         .map(|s| s.trim().to_string())
         .filter(|s| !s.is_empty())
         .collect()
}

fn optional_text(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

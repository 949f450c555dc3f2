//! Payloads de escritura para el almacén relacional remoto.
//!
//! Cada struct corresponde a las columnas escribibles de una tabla; `id` y
//! timestamps los asigna el almacén. Se serializan a objetos JSON
//! (snake_case) antes de pasar por el cliente de datos.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feedback::{FeedbackStatus, FeedbackType};
use crate::{Procedure, Relationship, Tool};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MakeRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRow {
    pub make_id: String,
    pub name: String,
    pub years: Option<String>,
}

/// Parche de modelo: el `make_id` no cambia al editar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPatch {
    pub name: String,
    pub years: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureRow {
    pub model_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub time_minutes: Option<u32>,
    pub cost_min: Option<u32>,
    pub cost_max: Option<u32>,
    pub tools: Vec<Tool>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    pub chip_type: Option<String>,
    pub pin_code: Option<String>,
}

impl ProcedureRow {
    pub fn from_procedure(model_id: &str, p: &Procedure) -> Self {
        ProcedureRow { model_id: model_id.to_string(),
                       title: p.title.clone(),
                       description: Some(p.description.clone()).filter(|d| !d.is_empty()),
                       category: p.category.as_str().to_string(),
                       difficulty: p.difficulty.as_str().to_string(),
                       time_minutes: Some(p.time_minutes),
                       cost_min: Some(p.cost.min()),
                       cost_max: Some(p.cost.max()),
                       tools: p.tools.clone(),
                       steps: p.steps.clone(),
                       notes: p.notes().to_vec(),
                       chip_type: p.chip_type.clone(),
                       pin_code: p.pin_code.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantRow {
    pub procedure_id: String,
    pub variant_name: String,
    pub hardware_type: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolGuideRow {
    pub variant_id: String,
    pub tool_name: String,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRow {
    pub procedure_id: String,
    pub linked_procedure_id: String,
    pub relationship: Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRow {
    pub procedure_id: String,
    pub variant_id: Option<String>,
    pub user_id: String,
    pub content: String,
    pub feedback_type: FeedbackType,
    pub status: FeedbackStatus,
}

/// Cambios que aplica una decisión de moderación.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackReview {
    pub status: FeedbackStatus,
    pub reviewed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRoleRow {
    pub user_id: String,
    pub role: String,
}

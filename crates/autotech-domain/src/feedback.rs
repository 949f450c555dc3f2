//! Feedback de la comunidad sobre un procedimiento y su ciclo de moderación.
//!
//! Estados: `pending` (inicial) → `approved` | `rejected`. Un moderador puede
//! volver a decidir sobre un feedback ya revisado, pero nunca devolverlo a
//! `pending`. Sólo lo aprobado es visible públicamente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

pub const MIN_CONTENT_CHARS: usize = 10;
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Tip,
    Correction,
    Question,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Tip => "tip",
            FeedbackType::Correction => "correction",
            FeedbackType::Question => "question",
        }
    }
}

impl FromStr for FeedbackType {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tip" => Ok(FeedbackType::Tip),
            "correction" => Ok(FeedbackType::Correction),
            "question" => Ok(FeedbackType::Question),
            other => Err(DomainError::UnknownValue { field: "feedback_type", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Approved,
    Rejected,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Approved => "approved",
            FeedbackStatus::Rejected => "rejected",
        }
    }

    /// Transiciones permitidas desde la moderación.
    pub fn can_move_to(&self, next: FeedbackStatus) -> bool {
        !matches!(next, FeedbackStatus::Pending)
    }
}

impl FromStr for FeedbackStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeedbackStatus::Pending),
            "approved" => Ok(FeedbackStatus::Approved),
            "rejected" => Ok(FeedbackStatus::Rejected),
            other => Err(DomainError::UnknownValue { field: "status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fila de `procedure_feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub procedure_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub user_id: String,
    pub content: String,
    pub feedback_type: FeedbackType,
    pub status: FeedbackStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Feedback {
    pub fn is_public(&self) -> bool {
        self.status == FeedbackStatus::Approved
    }
}

/// Envío de feedback antes de validar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDraft {
    pub procedure_id: String,
    pub variant_id: Option<String>,
    pub content: String,
    pub feedback_type: String,
}

impl FeedbackDraft {
    /// Devuelve el contenido recortado y el tipo ya parseado.
    pub fn validate(&self) -> Result<(String, FeedbackType), DomainError> {
        let content = validate_content(&self.content)?;
        let kind = self.feedback_type.trim().parse()?;
        Ok((content, kind))
    }
}

/// Única regla dura del sistema: 10..=2000 caracteres tras recortar.
pub fn validate_content(raw: &str) -> Result<String, DomainError> {
    let content = raw.trim();
    let len = content.chars().count();
    if len < MIN_CONTENT_CHARS {
        return Err(DomainError::validation(format!("Feedback must be at least {MIN_CONTENT_CHARS} characters")));
    }
    if len > MAX_CONTENT_CHARS {
        return Err(DomainError::validation(format!("Feedback must be less than {MAX_CONTENT_CHARS} characters")));
    }
    Ok(content.to_string())
}

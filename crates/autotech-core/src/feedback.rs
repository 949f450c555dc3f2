//! Envío de feedback y su moderación.
//!
//! Cualquier usuario autenticado envía feedback (queda `pending`). Sólo la
//! moderación, detrás de la compuerta admin, lo aprueba o rechaza; no hay
//! transiciones automáticas ni reintentos.

use autotech_domain::feedback::validate_content;
use autotech_domain::records::{FeedbackReview, FeedbackRow};
use autotech_domain::{Feedback, FeedbackDraft, FeedbackStatus};
use chrono::Utc;
use log::{debug, info};

use crate::auth::{AdminGate, CurrentUser};
use crate::remote::{decode, delete_one, insert_one, to_row, update_one, Query, RemoteDataClient, Table};
use crate::CoreError;

pub struct FeedbackService<C: RemoteDataClient> {
    client: C,
}

impl<C: RemoteDataClient> FeedbackService<C> {
    pub fn new(client: C) -> Self {
        FeedbackService { client }
    }

    pub fn submit(&self, user: &CurrentUser, draft: &FeedbackDraft) -> Result<Feedback, CoreError> {
        let (content, feedback_type) = draft.validate()?;
        let row = FeedbackRow { procedure_id: draft.procedure_id.clone(),
                                variant_id: draft.variant_id.clone().filter(|v| !v.is_empty()),
                                user_id: user.id.clone(),
                                content,
                                feedback_type,
                                status: FeedbackStatus::Pending };
        let inserted = decode::feedback(insert_one(&self.client, Table::ProcedureFeedback, to_row(&row)?)?)?;
        info!("feedback {} submitted on procedure {}", inserted.id, inserted.procedure_id);
        Ok(inserted)
    }

    /// Feedback público de un procedimiento: sólo aprobado, más reciente primero.
    pub fn approved_for(&self, procedure_id: &str) -> Result<Vec<Feedback>, CoreError> {
        let query = Query::all().eq("procedure_id", procedure_id)
                                .eq("status", FeedbackStatus::Approved.as_str())
                                .order_by("created_at", false);
        let rows = self.client.select(Table::ProcedureFeedback, &query)?;
        rows.into_iter().map(decode::feedback).collect()
    }
}

pub struct ModerationService<C: RemoteDataClient> {
    client: C,
}

impl<C: RemoteDataClient> ModerationService<C> {
    pub fn open(client: C, gate: &AdminGate, user: Option<&CurrentUser>) -> Result<Self, CoreError> {
        gate.authorize(&client, user)?;
        Ok(ModerationService { client })
    }

    /// `None` lista todos los estados. Más reciente primero.
    pub fn list(&self, status: Option<FeedbackStatus>) -> Result<Vec<Feedback>, CoreError> {
        let mut query = Query::all().order_by("created_at", false);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let rows = self.client.select(Table::ProcedureFeedback, &query)?;
        debug!("moderation list status={status:?} count={}", rows.len());
        rows.into_iter().map(decode::feedback).collect()
    }

    pub fn get(&self, id: &str) -> Result<Feedback, CoreError> {
        let rows = self.client.select(Table::ProcedureFeedback, &Query::all().eq("id", id))?;
        match rows.into_iter().next() {
            Some(row) => decode::feedback(row),
            None => Err(CoreError::not_found(format!("feedback '{id}'"))),
        }
    }

    /// Publica el feedback; opcionalmente reescribe el contenido (vuelve a
    /// validarse) y adjunta notas del moderador.
    pub fn approve(&self, id: &str, edited_content: Option<&str>, admin_notes: Option<&str>)
                   -> Result<Feedback, CoreError> {
        let content = edited_content.map(validate_content).transpose()?;
        self.review(id, FeedbackStatus::Approved, content, admin_notes)
    }

    pub fn reject(&self, id: &str, admin_notes: Option<&str>) -> Result<Feedback, CoreError> {
        self.review(id, FeedbackStatus::Rejected, None, admin_notes)
    }

    pub fn delete(&self, id: &str) -> Result<(), CoreError> {
        delete_one(&self.client, Table::ProcedureFeedback, id)
    }

    fn review(&self, id: &str, next: FeedbackStatus, content: Option<String>, admin_notes: Option<&str>)
              -> Result<Feedback, CoreError> {
        let current = self.get(id)?;
        if !current.status.can_move_to(next) {
            return Err(CoreError::Conflict(format!("feedback cannot move from {} to {next}", current.status)));
        }
        let review = FeedbackReview { status: next,
                                      reviewed_at: Utc::now(),
                                      content,
                                      admin_notes: admin_notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) };
        let updated = decode::feedback(update_one(&self.client, Table::ProcedureFeedback, id, to_row(&review)?)?)?;
        info!("feedback {id}: {} -> {next}", current.status);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GateMode;
    use crate::remote::InMemoryDataClient;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (FeedbackService<Arc<InMemoryDataClient>>, ModerationService<Arc<InMemoryDataClient>>, String) {
        let client = Arc::new(InMemoryDataClient::new());
        let make = insert_one(&client, Table::Makes, to_row(&json!({"name": "BMW"})).unwrap()).unwrap();
        let model = insert_one(&client,
                               Table::Models,
                               to_row(&json!({"make_id": make["id"], "name": "3 Series (E90)"})).unwrap()).unwrap();
        let proc = insert_one(&client,
                              Table::Procedures,
                              to_row(&json!({"model_id": model["id"], "title": "AKL", "category": "key-programming"}))
                                  .unwrap()).unwrap();
        let id = proc["id"].as_str().unwrap().to_string();
        let moderation = ModerationService::open(client.clone(), &AdminGate::new(GateMode::Disabled), None).unwrap();
        (FeedbackService::new(client), moderation, id)
    }

    fn user() -> CurrentUser {
        CurrentUser { id: "user-1".into(), email: "t@shop.io".into(), display_name: None }
    }

    fn draft(procedure_id: &str, content: &str) -> FeedbackDraft {
        FeedbackDraft { procedure_id: procedure_id.into(),
                        variant_id: None,
                        content: content.into(),
                        feedback_type: "tip".into() }
    }

    #[test]
    fn submission_starts_pending_and_is_not_public() {
        let (fb, _m, pid) = setup();
        let f = fb.submit(&user(), &draft(&pid, "Use a fresh battery when reading CAS")).unwrap();
        assert_eq!(f.status, FeedbackStatus::Pending);
        assert!(fb.approved_for(&pid).unwrap().is_empty());
        assert!(fb.submit(&user(), &draft(&pid, "too short")).is_err());
    }

    #[test]
    fn approval_can_rewrite_content_and_stamps_review() {
        let (fb, m, pid) = setup();
        let f = fb.submit(&user(), &draft(&pid, "CAS3 needs the ISN from DME")).unwrap();
        let approved = m.approve(&f.id, Some("  CAS3+ needs the ISN read from the DME  "), Some("verified"))
                        .unwrap();
        assert_eq!(approved.status, FeedbackStatus::Approved);
        assert_eq!(approved.content, "CAS3+ needs the ISN read from the DME");
        assert_eq!(approved.admin_notes.as_deref(), Some("verified"));
        assert!(approved.reviewed_at.is_some());
        assert_eq!(fb.approved_for(&pid).unwrap().len(), 1);
        assert!(m.approve(&f.id, Some("short"), None).is_err());
    }

    #[test]
    fn moderation_lists_by_status_and_deletes() {
        let (fb, m, pid) = setup();
        let a = fb.submit(&user(), &draft(&pid, "First piece of feedback")).unwrap();
        let b = fb.submit(&user(), &draft(&pid, "Second piece of feedback")).unwrap();
        m.reject(&a.id, None).unwrap();
        assert_eq!(m.list(Some(FeedbackStatus::Pending)).unwrap().len(), 1);
        assert_eq!(m.list(Some(FeedbackStatus::Rejected)).unwrap()[0].id, a.id);
        assert_eq!(m.list(None).unwrap().len(), 2);
        m.delete(&b.id).unwrap();
        assert!(matches!(m.get(&b.id), Err(CoreError::NotFound(_))));
        // una decisión ya tomada puede revisarse
        assert_eq!(m.approve(&a.id, None, None).unwrap().status, FeedbackStatus::Approved);
    }
}

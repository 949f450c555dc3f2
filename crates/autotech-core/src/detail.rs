//! Vista de detalle de un procedimiento (backend remoto).
//!
//! Reúne el procedimiento compuesto, sus variantes, las guías de la variante
//! seleccionada, los enlaces resueltos y el feedback aprobado. Los pasos que
//! se muestran son los de la guía seleccionada cuando tiene alguno; si no,
//! los del procedimiento. Las notas se concatenan: variante, guía,
//! procedimiento.

use autotech_domain::{Difficulty, Feedback, Relationship, ServiceCategory, ToolGuide, Variant};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::display::{compose, DisplayProcedure, RawProcedure};
use crate::feedback::FeedbackService;
use crate::remote::{decode, text, Query, RemoteDataClient, Table};
use crate::repo::{CatalogRepository, RemoteCatalogRepository};
use crate::CoreError;

/// Variante y guía elegidas por el usuario. `None` = la primera disponible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailSelection {
    pub variant_id: Option<String>,
    pub tool_guide_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedSummary {
    pub relationship: Relationship,
    pub id: String,
    pub title: String,
    pub category: Option<ServiceCategory>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureDetail {
    pub procedure: DisplayProcedure,
    pub variants: Vec<Variant>,
    pub selected_variant: Option<String>,
    pub tool_guides: Vec<ToolGuide>,
    pub selected_tool_guide: Option<String>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    pub linked: Vec<LinkedSummary>,
    pub feedback: Vec<Feedback>,
}

pub struct DetailLoader<C: RemoteDataClient> {
    catalog: RemoteCatalogRepository<C>,
}

impl<C: RemoteDataClient> DetailLoader<C> {
    pub fn new(client: C) -> Self {
        DetailLoader { catalog: RemoteCatalogRepository::new(client) }
    }

    pub fn load(&self, procedure_id: &str, selection: &DetailSelection) -> Result<ProcedureDetail, CoreError> {
        let procedure = self.catalog.procedure(procedure_id)?;
        let client = self.catalog.client();

        let variants: Vec<Variant> =
            client.select(Table::ProcedureVariants,
                          &Query::all().eq("procedure_id", procedure_id).order_by("created_at", true))?
                  .iter()
                  .map(decode::variant)
                  .collect();
        let variant = pick(&variants, selection.variant_id.as_deref(), |v| &v.id);

        let tool_guides: Vec<ToolGuide> = match variant {
            Some(v) => client.select(Table::ToolGuides,
                                     &Query::all().eq("variant_id", v.id.as_str()).order_by("created_at", true))?
                             .iter()
                             .map(decode::tool_guide)
                             .collect(),
            None => Vec::new(),
        };
        let guide = pick(&tool_guides, selection.tool_guide_id.as_deref(), |g| &g.id);

        let steps = match guide {
            Some(g) if !g.steps.is_empty() => g.steps.clone(),
            _ => procedure.steps.clone(),
        };
        let mut notes = Vec::new();
        notes.extend(variant.iter().flat_map(|v| v.notes.iter().cloned()));
        notes.extend(guide.iter().flat_map(|g| g.notes.iter().cloned()));
        notes.extend(procedure.notes.iter().cloned());

        let linked = self.linked(procedure_id)?;
        let feedback = FeedbackService::new(client).approved_for(procedure_id)?;
        debug!("detail {procedure_id}: variants={} guides={} links={} feedback={}",
               variants.len(),
               tool_guides.len(),
               linked.len(),
               feedback.len());

        Ok(ProcedureDetail { selected_variant: variant.map(|v| v.id.clone()),
                             selected_tool_guide: guide.map(|g| g.id.clone()),
                             procedure,
                             variants,
                             tool_guides,
                             steps,
                             notes,
                             linked,
                             feedback })
    }

    /// Enlaces salientes resueltos; los que apuntan a un procedimiento
    /// inexistente se descartan.
    fn linked(&self, procedure_id: &str) -> Result<Vec<LinkedSummary>, CoreError> {
        let client = self.catalog.client();
        let links: Vec<_> = client.select(Table::LinkedProcedures,
                                          &Query::all().eq("procedure_id", procedure_id).order_by("created_at", true))?
                                  .iter()
                                  .map(decode::link)
                                  .collect();
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = links.iter().map(|l| l.linked_procedure_id.clone()).collect();
        let rows = client.select(Table::Procedures, &Query::all().is_in("id", ids))?;
        let by_id: HashMap<String, DisplayProcedure> =
            rows.into_iter()
                .map(|r| (text(&r, "id"), compose(RawProcedure::Remote(&serde_json::Value::Object(r)))))
                .collect();
        Ok(links.into_iter()
                .filter_map(|l| {
                    by_id.get(&l.linked_procedure_id).map(|p| LinkedSummary { relationship: l.relationship,
                                                                              id: p.id.clone(),
                                                                              title: p.title.clone(),
                                                                              category: p.category,
                                                                              difficulty: p.difficulty })
                })
                .collect())
    }
}

fn pick<'a, T>(items: &'a [T], wanted: Option<&str>, id: impl Fn(&T) -> &String) -> Option<&'a T> {
    match wanted {
        Some(w) => items.iter().find(|i| id(*i) == w).or_else(|| items.first()),
        None => items.first(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminService;
    use crate::auth::{AdminGate, CurrentUser, GateMode};
    use crate::local::seed_catalog;
    use crate::remote::InMemoryDataClient;
    use crate::repo::ProcedureScope;
    use autotech_domain::records::{ToolGuideRow, VariantRow};
    use autotech_domain::FeedbackDraft;
    use std::sync::Arc;

    struct Fixture {
        client: Arc<InMemoryDataClient>,
        admin: AdminService<Arc<InMemoryDataClient>>,
        ids: Vec<String>,
    }

    fn fixture() -> Fixture {
        let client = Arc::new(InMemoryDataClient::new());
        let admin = AdminService::open(client.clone(), &AdminGate::new(GateMode::Disabled), None).unwrap();
        admin.catalog().import_catalog(&seed_catalog().unwrap()).unwrap();
        let ids = admin.catalog()
                       .procedures(&ProcedureScope::All)
                       .unwrap()
                       .into_iter()
                       .map(|p| p.id)
                       .collect();
        Fixture { client, admin, ids }
    }

    #[test]
    fn without_variants_uses_procedure_steps_and_notes() {
        let f = fixture();
        let detail = DetailLoader::new(f.client.clone()).load(&f.ids[0], &DetailSelection::default()).unwrap();
        assert_eq!(detail.procedure.title, "All Keys Lost - Key Programming");
        assert_eq!(detail.steps, detail.procedure.steps);
        assert_eq!(detail.notes, detail.procedure.notes);
        assert!(detail.selected_variant.is_none());
    }

    #[test]
    fn selected_guide_replaces_steps_and_notes_are_merged() {
        let f = fixture();
        let v1 = f.admin
                  .add_variant(VariantRow { procedure_id: f.ids[0].clone(),
                                            variant_name: "CAS3".into(),
                                            hardware_type: None,
                                            notes: vec!["variant note".into()] })
                  .unwrap();
        let v2 = f.admin
                  .add_variant(VariantRow { procedure_id: f.ids[0].clone(),
                                            variant_name: "CAS3+".into(),
                                            hardware_type: Some("9S12".into()),
                                            notes: vec![] })
                  .unwrap();
        f.admin
         .add_tool_guide(ToolGuideRow { variant_id: v2.id.clone(),
                                        tool_name: "XP400".into(),
                                        steps: vec!["Read D-flash".into()],
                                        notes: vec!["guide note".into()] })
         .unwrap();
        let loader = DetailLoader::new(f.client.clone());

        let first = loader.load(&f.ids[0], &DetailSelection::default()).unwrap();
        assert_eq!(first.selected_variant.as_deref(), Some(v1.id.as_str()));
        assert_eq!(first.notes[0], "variant note");

        let second = loader.load(&f.ids[0],
                                 &DetailSelection { variant_id: Some(v2.id.clone()), tool_guide_id: None })
                           .unwrap();
        assert_eq!(second.steps, vec!["Read D-flash"]);
        assert_eq!(second.notes[0], "guide note");
        assert_eq!(second.notes.len(), 1 + second.procedure.notes.len());
    }

    #[test]
    fn links_resolve_and_only_approved_feedback_shows() {
        let f = fixture();
        f.admin.add_link(&f.ids[0], &f.ids[1], Relationship::Recommended).unwrap();
        let user = CurrentUser { id: "u".into(), email: "u@x.io".into(), display_name: None };
        let fb = FeedbackService::new(f.client.clone());
        let draft = FeedbackDraft { procedure_id: f.ids[0].clone(),
                                    variant_id: None,
                                    content: "Works on 2008 models too".into(),
                                    feedback_type: "tip".into() };
        let submitted = fb.submit(&user, &draft).unwrap();
        fb.submit(&user, &draft).unwrap();
        crate::feedback::ModerationService::open(f.client.clone(), &AdminGate::new(GateMode::Disabled), None)
            .unwrap()
            .approve(&submitted.id, None, None)
            .unwrap();

        let detail = DetailLoader::new(f.client.clone()).load(&f.ids[0], &DetailSelection::default()).unwrap();
        assert_eq!(detail.linked.len(), 1);
        assert_eq!(detail.linked[0].id, f.ids[1]);
        assert_eq!(detail.linked[0].relationship, Relationship::Recommended);
        assert_eq!(detail.feedback.len(), 1);
    }

    #[test]
    fn unknown_procedure_is_not_found() {
        let f = fixture();
        let res = DetailLoader::new(f.client).load("nope", &DetailSelection::default());
        assert!(matches!(res, Err(CoreError::NotFound(_))));
    }
}

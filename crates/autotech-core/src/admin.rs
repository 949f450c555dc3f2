//! Flujos CRUD de administración sobre el cliente remoto.
//!
//! Marcas, modelos y procedimientos se gestionan a través del repositorio
//! remoto (`catalog_mut`); aquí viven variantes, guías por herramienta y
//! enlaces entre procedimientos. Todo borrado de un padre es una única
//! llamada: la cascada es responsabilidad del almacén.

use autotech_domain::records::{LinkRow, ToolGuideRow, VariantRow};
use autotech_domain::{LinkedProcedure, Relationship, ToolGuide, Variant};
use log::info;
use std::collections::HashSet;

use crate::auth::{AdminGate, CurrentUser};
use crate::display::DisplayProcedure;
use crate::remote::{decode, delete_one, insert_one, to_row, update_one, Query, RemoteDataClient, Table};
use crate::repo::{CatalogRepository, ProcedureScope, RemoteCatalogRepository};
use crate::CoreError;

pub struct AdminService<C: RemoteDataClient> {
    catalog: RemoteCatalogRepository<C>,
}

impl<C: RemoteDataClient> AdminService<C> {
    /// Sólo se construye si la compuerta autoriza al usuario.
    pub fn open(client: C, gate: &AdminGate, user: Option<&CurrentUser>) -> Result<Self, CoreError> {
        gate.authorize(&client, user)?;
        Ok(AdminService { catalog: RemoteCatalogRepository::new(client) })
    }

    pub fn catalog(&self) -> &RemoteCatalogRepository<C> {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut RemoteCatalogRepository<C> {
        &mut self.catalog
    }

    fn client(&self) -> &C {
        self.catalog.client()
    }

    // -- variantes ---------------------------------------------------------

    pub fn variants(&self, procedure_id: &str) -> Result<Vec<Variant>, CoreError> {
        let rows = self.client().select(Table::ProcedureVariants,
                                        &Query::all().eq("procedure_id", procedure_id).order_by("created_at", true))?;
        Ok(rows.iter().map(decode::variant).collect())
    }

    pub fn add_variant(&self, row: VariantRow) -> Result<Variant, CoreError> {
        let row = clean_variant(row)?;
        let inserted = insert_one(self.client(), Table::ProcedureVariants, to_row(&row)?)?;
        info!("created variant '{}' for procedure {}", row.variant_name, row.procedure_id);
        Ok(decode::variant(&inserted))
    }

    /// `procedure_id` de la fila se ignora: una variante no cambia de procedimiento.
    pub fn update_variant(&self, id: &str, row: VariantRow) -> Result<Variant, CoreError> {
        let mut patch = to_row(&clean_variant(row)?)?;
        patch.remove("procedure_id");
        Ok(decode::variant(&update_one(self.client(), Table::ProcedureVariants, id, patch)?))
    }

    pub fn delete_variant(&self, id: &str) -> Result<(), CoreError> {
        delete_one(self.client(), Table::ProcedureVariants, id)
    }

    // -- guías por herramienta ---------------------------------------------

    pub fn tool_guides(&self, variant_id: &str) -> Result<Vec<ToolGuide>, CoreError> {
        let rows = self.client().select(Table::ToolGuides,
                                        &Query::all().eq("variant_id", variant_id).order_by("created_at", true))?;
        Ok(rows.iter().map(decode::tool_guide).collect())
    }

    pub fn add_tool_guide(&self, row: ToolGuideRow) -> Result<ToolGuide, CoreError> {
        let row = clean_tool_guide(row)?;
        let inserted = insert_one(self.client(), Table::ToolGuides, to_row(&row)?)?;
        info!("created tool guide '{}' for variant {}", row.tool_name, row.variant_id);
        Ok(decode::tool_guide(&inserted))
    }

    pub fn update_tool_guide(&self, id: &str, row: ToolGuideRow) -> Result<ToolGuide, CoreError> {
        let mut patch = to_row(&clean_tool_guide(row)?)?;
        patch.remove("variant_id");
        Ok(decode::tool_guide(&update_one(self.client(), Table::ToolGuides, id, patch)?))
    }

    pub fn delete_tool_guide(&self, id: &str) -> Result<(), CoreError> {
        delete_one(self.client(), Table::ToolGuides, id)
    }

    // -- enlaces -----------------------------------------------------------

    pub fn links(&self, procedure_id: &str) -> Result<Vec<LinkedProcedure>, CoreError> {
        let rows = self.client().select(Table::LinkedProcedures,
                                        &Query::all().eq("procedure_id", procedure_id).order_by("created_at", true))?;
        Ok(rows.iter().map(decode::link).collect())
    }

    /// Procedimientos que todavía se pueden enlazar desde `procedure_id`.
    pub fn link_candidates(&self, procedure_id: &str) -> Result<Vec<DisplayProcedure>, CoreError> {
        let linked: HashSet<String> = self.links(procedure_id)?
                                          .into_iter()
                                          .map(|l| l.linked_procedure_id)
                                          .collect();
        Ok(self.catalog
               .procedures(&ProcedureScope::All)?
               .into_iter()
               .filter(|p| p.id != procedure_id && !linked.contains(&p.id))
               .collect())
    }

    /// Rechaza auto-enlaces y pares ya enlazados antes de escribir; el
    /// almacén sigue siendo la autoridad final (clave única + check).
    pub fn add_link(&self, procedure_id: &str, target_id: &str, relationship: Relationship)
                    -> Result<LinkedProcedure, CoreError> {
        LinkedProcedure::check_endpoints(procedure_id, target_id).map_err(|e| CoreError::Conflict(e.to_string()))?;
        if self.links(procedure_id)?.iter().any(|l| l.linked_procedure_id == target_id) {
            return Err(CoreError::Conflict(format!("{procedure_id} is already linked to {target_id}")));
        }
        let row = LinkRow { procedure_id: procedure_id.to_string(),
                            linked_procedure_id: target_id.to_string(),
                            relationship };
        let inserted = insert_one(self.client(), Table::LinkedProcedures, to_row(&row)?)?;
        info!("linked {procedure_id} -> {target_id} ({relationship})");
        Ok(decode::link(&inserted))
    }

    pub fn delete_link(&self, id: &str) -> Result<(), CoreError> {
        delete_one(self.client(), Table::LinkedProcedures, id)
    }
}

fn clean_variant(row: VariantRow) -> Result<VariantRow, CoreError> {
    let variant_name = row.variant_name.trim().to_string();
    autotech_domain::vehicle::validate_name("variant", &variant_name)?;
    Ok(VariantRow { variant_name,
                    hardware_type: row.hardware_type
                                      .map(|h| h.trim().to_string())
                                      .filter(|h| !h.is_empty()),
                    notes: non_blank(row.notes),
                    ..row })
}

fn clean_tool_guide(row: ToolGuideRow) -> Result<ToolGuideRow, CoreError> {
    let tool_name = row.tool_name.trim().to_string();
    autotech_domain::vehicle::validate_name("tool", &tool_name)?;
    Ok(ToolGuideRow { tool_name, steps: non_blank(row.steps), notes: non_blank(row.notes), ..row })
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items.into_iter()
         .map(|s| s.trim().to_string())
         .filter(|s| !s.is_empty())
         .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GateMode;
    use crate::local::seed_catalog;
    use crate::remote::InMemoryDataClient;
    use std::sync::Arc;

    fn service() -> (Arc<InMemoryDataClient>, AdminService<Arc<InMemoryDataClient>>, Vec<String>) {
        let client = Arc::new(InMemoryDataClient::new());
        let admin = AdminService::open(client.clone(), &AdminGate::new(GateMode::Disabled), None).unwrap();
        admin.catalog().import_catalog(&seed_catalog().unwrap()).unwrap();
        let ids = admin.catalog()
                       .procedures(&ProcedureScope::All)
                       .unwrap()
                       .into_iter()
                       .map(|p| p.id)
                       .collect();
        (client, admin, ids)
    }

    #[test]
    fn enforced_gate_blocks_anonymous_admins() {
        let client = Arc::new(InMemoryDataClient::new());
        let res = AdminService::open(client, &AdminGate::new(GateMode::Enforced), None);
        assert!(matches!(res, Err(CoreError::Unauthorized(_))));
    }

    #[test]
    fn variants_and_guides_are_cleaned_and_cascade() {
        let (client, admin, ids) = service();
        let v = admin.add_variant(VariantRow { procedure_id: ids[0].clone(),
                                               variant_name: "  CAS3+ ".into(),
                                               hardware_type: Some(" ".into()),
                                               notes: vec!["keep ISN".into(), "  ".into()] })
                     .unwrap();
        assert_eq!(v.variant_name, "CAS3+");
        assert_eq!(v.hardware_type, None);
        assert_eq!(v.notes, vec!["keep ISN"]);
        admin.add_tool_guide(ToolGuideRow { variant_id: v.id.clone(),
                                            tool_name: "XP400".into(),
                                            steps: vec!["Read EEPROM".into()],
                                            notes: vec![] })
             .unwrap();
        assert_eq!(admin.tool_guides(&v.id).unwrap().len(), 1);
        admin.delete_variant(&v.id).unwrap();
        assert_eq!(client.count(Table::ToolGuides), 0);
    }

    #[test]
    fn links_reject_self_and_duplicates() {
        let (_c, admin, ids) = service();
        assert!(matches!(admin.add_link(&ids[0], &ids[0], Relationship::Related), Err(CoreError::Conflict(_))));
        admin.add_link(&ids[0], &ids[1], Relationship::Required).unwrap();
        assert!(matches!(admin.add_link(&ids[0], &ids[1], Relationship::Related), Err(CoreError::Conflict(_))));
        let candidates = admin.link_candidates(&ids[0]).unwrap();
        assert_eq!(candidates.len(), ids.len() - 2);
        assert!(candidates.iter().all(|p| p.id != ids[0] && p.id != ids[1]));
    }

    #[test]
    fn deleting_a_procedure_drops_its_links() {
        let (client, mut admin, ids) = service();
        admin.add_link(&ids[0], &ids[1], Relationship::Related).unwrap();
        admin.catalog_mut().delete_procedure(&ids[1]).unwrap();
        assert_eq!(client.count(Table::LinkedProcedures), 0);
        assert!(matches!(admin.delete_link("missing"), Err(CoreError::NotFound(_))));
    }
}

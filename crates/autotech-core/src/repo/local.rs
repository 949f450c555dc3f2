use autotech_domain::Procedure;
use log::debug;

use super::{CatalogRepository, MakeSummary, ModelKey, ModelSummary, ProcedureScope};
use crate::display::{compose, DisplayProcedure, RawProcedure};
use crate::local::{KeyValueStore, LocalCatalogStore, ModelInfo};
use crate::search::{scoped_procedures, VehicleSelection};
use crate::CoreError;

/// Catálogo local. Marcas y modelos se identifican por su nombre.
pub struct LocalCatalogRepository<S: KeyValueStore> {
    store: LocalCatalogStore<S>,
}

impl<S: KeyValueStore> LocalCatalogRepository<S> {
    pub fn new(store: LocalCatalogStore<S>) -> Self {
        LocalCatalogRepository { store }
    }

    /// Acceso al adaptador para export/import/reset.
    pub fn store(&self) -> &LocalCatalogStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalCatalogStore<S> {
        &mut self.store
    }

    fn location(&self, procedure_id: &str) -> Result<(String, String), CoreError> {
        self.store
            .procedure(procedure_id)
            .map(|(make, model, _)| (make.make.clone(), model.model.clone()))
            .ok_or_else(|| CoreError::not_found(format!("procedure '{procedure_id}'")))
    }
}

impl<S: KeyValueStore> CatalogRepository for LocalCatalogRepository<S> {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn makes(&self) -> Result<Vec<MakeSummary>, CoreError> {
        Ok(self.store
               .makes()
               .iter()
               .map(|m| MakeSummary { id: m.make.clone(), name: m.make.clone(), model_count: m.models.len() })
               .collect())
    }

    fn models(&self, make_id: &str) -> Result<Vec<ModelSummary>, CoreError> {
        let make = self.store
                       .make(make_id)
                       .ok_or_else(|| CoreError::not_found(format!("make '{make_id}'")))?;
        Ok(make.models
               .iter()
               .map(|m| ModelSummary { id: m.model.clone(),
                                       make_id: make.make.clone(),
                                       name: m.model.clone(),
                                       years: m.years.clone(),
                                       procedure_count: m.procedures.len() })
               .collect())
    }

    fn procedures(&self, scope: &ProcedureScope) -> Result<Vec<DisplayProcedure>, CoreError> {
        let selection = match scope {
            ProcedureScope::All => VehicleSelection::All,
            ProcedureScope::Make(make) => VehicleSelection::Make(make.clone()),
            ProcedureScope::Model(key) => VehicleSelection::Model { make: key.make_id.clone(),
                                                                    model: key.model_id.clone() },
        };
        let out = scoped_procedures(self.store.makes(), &selection);
        debug!("local procedures scope={scope:?} count={}", out.len());
        Ok(out)
    }

    fn procedure(&self, id: &str) -> Result<DisplayProcedure, CoreError> {
        let (make, model, p) = self.store
                                   .procedure(id)
                                   .ok_or_else(|| CoreError::not_found(format!("procedure '{id}'")))?;
        Ok(compose(RawProcedure::Local { procedure: p,
                                         make_name: Some(&make.make),
                                         model_name: Some(&model.model) }))
    }

    fn add_make(&mut self, name: &str) -> Result<MakeSummary, CoreError> {
        self.store.add_make(name)?;
        let name = name.trim().to_string();
        Ok(MakeSummary { id: name.clone(), name, model_count: 0 })
    }

    fn rename_make(&mut self, make_id: &str, new_name: &str) -> Result<(), CoreError> {
        self.store.update_make(make_id, new_name)
    }

    fn delete_make(&mut self, make_id: &str) -> Result<(), CoreError> {
        self.store.delete_make(make_id)
    }

    fn add_model(&mut self, make_id: &str, info: &ModelInfo) -> Result<ModelKey, CoreError> {
        self.store.add_model(make_id, info)?;
        Ok(ModelKey::new(make_id, info.model.trim()))
    }

    fn update_model(&mut self, key: &ModelKey, info: &ModelInfo) -> Result<(), CoreError> {
        self.store.update_model(&key.make_id, &key.model_id, info)
    }

    fn delete_model(&mut self, key: &ModelKey) -> Result<(), CoreError> {
        self.store.delete_model(&key.make_id, &key.model_id)
    }

    fn add_procedure(&mut self, key: &ModelKey, procedure: Procedure) -> Result<String, CoreError> {
        if self.store.procedure(&procedure.id).is_some() {
            return Err(CoreError::Conflict(format!("procedure id '{}' already exists", procedure.id)));
        }
        let id = procedure.id.clone();
        self.store.add_procedure(&key.make_id, &key.model_id, procedure)?;
        Ok(id)
    }

    fn update_procedure(&mut self, id: &str, procedure: Procedure) -> Result<(), CoreError> {
        let (make, model) = self.location(id)?;
        self.store.update_procedure(&make, &model, id, procedure)
    }

    fn delete_procedure(&mut self, id: &str) -> Result<(), CoreError> {
        let (make, model) = self.location(id)?;
        self.store.delete_procedure(&make, &model, id)
    }
}

//! Interfaz única del catálogo sobre los dos backends.
//!
//! `LocalCatalogRepository` envuelve el adaptador local (identificadores =
//! nombres) y `RemoteCatalogRepository` trabaja sobre `RemoteDataClient`
//! (identificadores = ids de fila). Los llamadores no distinguen el backend.
//!
//! Concurrencia: última escritura gana. Ninguna implementación versiona las
//! entidades ni detecta ediciones concurrentes de la misma entidad.

use autotech_domain::Procedure;
use serde::{Deserialize, Serialize};

use crate::display::DisplayProcedure;
use crate::local::ModelInfo;
use crate::CoreError;

pub mod local;
pub mod remote;

pub use local::LocalCatalogRepository;
pub use remote::RemoteCatalogRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeSummary {
    pub id: String,
    pub name: String,
    pub model_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: String,
    pub make_id: String,
    pub name: String,
    pub years: String,
    pub procedure_count: usize,
}

/// Identifica un modelo dentro de su marca.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub make_id: String,
    pub model_id: String,
}

impl ModelKey {
    pub fn new(make_id: &str, model_id: &str) -> Self {
        ModelKey { make_id: make_id.to_string(), model_id: model_id.to_string() }
    }
}

/// Alcance del conjunto de trabajo de procedimientos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcedureScope {
    #[default]
    All,
    Make(String),
    Model(ModelKey),
}

/// Vista anidada del catálogo para navegación.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MakeNode {
    pub make: MakeSummary,
    pub models: Vec<ModelNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelNode {
    pub model: ModelSummary,
    pub procedures: Vec<DisplayProcedure>,
}

pub trait CatalogRepository: Send {
    /// Nombre corto del backend (`local` / `remote`), para logs.
    fn backend(&self) -> &'static str;

    fn makes(&self) -> Result<Vec<MakeSummary>, CoreError>;
    fn models(&self, make_id: &str) -> Result<Vec<ModelSummary>, CoreError>;
    /// Procedimientos compuestos (con marca y modelo) en orden de catálogo.
    fn procedures(&self, scope: &ProcedureScope) -> Result<Vec<DisplayProcedure>, CoreError>;
    /// `CoreError::NotFound` si no existe.
    fn procedure(&self, id: &str) -> Result<DisplayProcedure, CoreError>;

    fn add_make(&mut self, name: &str) -> Result<MakeSummary, CoreError>;
    fn rename_make(&mut self, make_id: &str, new_name: &str) -> Result<(), CoreError>;
    /// Borra la marca con sus modelos y procedimientos.
    fn delete_make(&mut self, make_id: &str) -> Result<(), CoreError>;

    fn add_model(&mut self, make_id: &str, info: &ModelInfo) -> Result<ModelKey, CoreError>;
    fn update_model(&mut self, key: &ModelKey, info: &ModelInfo) -> Result<(), CoreError>;
    /// Borra el modelo con sus procedimientos.
    fn delete_model(&mut self, key: &ModelKey) -> Result<(), CoreError>;

    /// Devuelve el id con el que quedó guardado el procedimiento.
    fn add_procedure(&mut self, key: &ModelKey, procedure: Procedure) -> Result<String, CoreError>;
    fn update_procedure(&mut self, id: &str, procedure: Procedure) -> Result<(), CoreError>;
    fn delete_procedure(&mut self, id: &str) -> Result<(), CoreError>;

    fn tree(&self) -> Result<Vec<MakeNode>, CoreError> {
        let mut out = Vec::new();
        for make in self.makes()? {
            let mut models = Vec::new();
            for model in self.models(&make.id)? {
                let key = ModelKey::new(&make.id, &model.id);
                let procedures = self.procedures(&ProcedureScope::Model(key))?;
                models.push(ModelNode { model, procedures });
            }
            out.push(MakeNode { make, models });
        }
        Ok(out)
    }
}

impl<T: CatalogRepository + ?Sized> CatalogRepository for Box<T> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }
    fn makes(&self) -> Result<Vec<MakeSummary>, CoreError> {
        (**self).makes()
    }
    fn models(&self, make_id: &str) -> Result<Vec<ModelSummary>, CoreError> {
        (**self).models(make_id)
    }
    fn procedures(&self, scope: &ProcedureScope) -> Result<Vec<DisplayProcedure>, CoreError> {
        (**self).procedures(scope)
    }
    fn procedure(&self, id: &str) -> Result<DisplayProcedure, CoreError> {
        (**self).procedure(id)
    }
    fn add_make(&mut self, name: &str) -> Result<MakeSummary, CoreError> {
        (**self).add_make(name)
    }
    fn rename_make(&mut self, make_id: &str, new_name: &str) -> Result<(), CoreError> {
        (**self).rename_make(make_id, new_name)
    }
    fn delete_make(&mut self, make_id: &str) -> Result<(), CoreError> {
        (**self).delete_make(make_id)
    }
    fn add_model(&mut self, make_id: &str, info: &ModelInfo) -> Result<ModelKey, CoreError> {
        (**self).add_model(make_id, info)
    }
    fn update_model(&mut self, key: &ModelKey, info: &ModelInfo) -> Result<(), CoreError> {
        (**self).update_model(key, info)
    }
    fn delete_model(&mut self, key: &ModelKey) -> Result<(), CoreError> {
        (**self).delete_model(key)
    }
    fn add_procedure(&mut self, key: &ModelKey, procedure: Procedure) -> Result<String, CoreError> {
        (**self).add_procedure(key, procedure)
    }
    fn update_procedure(&mut self, id: &str, procedure: Procedure) -> Result<(), CoreError> {
        (**self).update_procedure(id, procedure)
    }
    fn delete_procedure(&mut self, id: &str) -> Result<(), CoreError> {
        (**self).delete_procedure(id)
    }
}

use autotech_domain::records::{MakeRow, ModelPatch, ModelRow, ProcedureRow};
use autotech_domain::{Procedure, VehicleMake};
use chrono::Utc;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;

use super::{CatalogRepository, MakeSummary, ModelKey, ModelSummary, ProcedureScope};
use crate::display::{compose, DisplayProcedure, RawProcedure};
use crate::local::ModelInfo;
use crate::remote::{delete_one, insert_one, text, to_row, update_one, Query, RemoteDataClient, Row, Table};
use crate::CoreError;

/// Catálogo sobre las tablas `makes`, `models` y `procedures`.
///
/// Los borrados emiten una sola llamada sobre el padre; la cascada la aplica
/// el almacén.
pub struct RemoteCatalogRepository<C: RemoteDataClient> {
    client: C,
}

impl<C: RemoteDataClient> RemoteCatalogRepository<C> {
    pub fn new(client: C) -> Self {
        RemoteCatalogRepository { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn make_rows(&self) -> Result<Vec<Row>, CoreError> {
        self.client.select(Table::Makes, &Query::all().order_by("name", true))
    }

    fn model_rows(&self, make_ids: Option<&[String]>) -> Result<Vec<Row>, CoreError> {
        let mut query = Query::all().order_by("name", true);
        if let Some(ids) = make_ids {
            query = query.is_in("make_id", ids.iter().cloned());
        }
        self.client.select(Table::Models, &query)
    }

    /// `Conflict` si otra fila (distinta de `exclude`) ya coincide con `query`.
    fn ensure_name_free(&self, table: Table, query: Query, exclude: Option<&str>, name: &str)
                        -> Result<(), CoreError> {
        let rows = self.client.select(table, &query.select(&["id"]))?;
        if rows.iter().any(|r| Some(text(r, "id").as_str()) != exclude) {
            return Err(CoreError::Conflict(format!("{table} '{name}' already exists")));
        }
        Ok(())
    }

    /// Inyecta `make_name`/`model_name` y compone cada fila.
    fn compose_rows(&self, rows: Vec<Row>, models: &[Row], makes: &[Row]) -> Vec<DisplayProcedure> {
        let make_names: HashMap<String, String> =
            makes.iter().map(|m| (text(m, "id"), text(m, "name"))).collect();
        let model_info: HashMap<String, (String, String)> =
            models.iter()
                  .map(|m| (text(m, "id"), (text(m, "name"), text(m, "make_id"))))
                  .collect();
        rows.into_iter()
            .map(|mut row| {
                if let Some((model_name, make_id)) = model_info.get(&text(&row, "model_id")) {
                    row.insert("model_name".into(), Value::from(model_name.as_str()));
                    if let Some(make_name) = make_names.get(make_id) {
                        row.insert("make_name".into(), Value::from(make_name.as_str()));
                    }
                }
                compose(RawProcedure::Remote(&Value::Object(row)))
            })
            .collect()
    }

    /// Copia un catálogo anidado (formato de exportación) a las tablas.
    /// Devuelve la cantidad de procedimientos insertados.
    pub fn import_catalog(&self, catalog: &[VehicleMake]) -> Result<usize, CoreError> {
        let mut inserted = 0;
        for make in catalog {
            make.validate()?;
            let row = MakeRow { name: make.make.clone(), logo_url: make.logo.clone() };
            let make_id = new_id(insert_one(&self.client, Table::Makes, to_row(&row)?)?)?;
            for model in &make.models {
                let row = ModelRow { make_id: make_id.clone(),
                                     name: model.model.clone(),
                                     years: Some(model.years.clone()).filter(|y| !y.is_empty()) };
                let model_id = new_id(insert_one(&self.client, Table::Models, to_row(&row)?)?)?;
                let rows = model.procedures
                                .iter()
                                .map(|p| to_row(&ProcedureRow::from_procedure(&model_id, p)))
                                .collect::<Result<Vec<_>, _>>()?;
                inserted += rows.len();
                if !rows.is_empty() {
                    self.client.insert(Table::Procedures, rows)?;
                }
            }
        }
        info!("imported catalog into remote store makes={} procedures={inserted}", catalog.len());
        Ok(inserted)
    }
}

fn new_id(row: Row) -> Result<String, CoreError> {
    Some(text(&row, "id")).filter(|id| !id.is_empty())
                          .ok_or_else(|| CoreError::Storage("store returned a row without id".into()))
}

fn count_by(rows: &[Row], column: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for row in rows {
        *counts.entry(text(row, column)).or_insert(0) += 1;
    }
    counts
}

impl<C: RemoteDataClient> CatalogRepository for RemoteCatalogRepository<C> {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn makes(&self) -> Result<Vec<MakeSummary>, CoreError> {
        let makes = self.make_rows()?;
        let models = self.client.select(Table::Models, &Query::all().select(&["id", "make_id"]))?;
        let counts = count_by(&models, "make_id");
        Ok(makes.iter()
                .map(|m| {
                    let id = text(m, "id");
                    MakeSummary { model_count: counts.get(&id).copied().unwrap_or(0), name: text(m, "name"), id }
                })
                .collect())
    }

    fn models(&self, make_id: &str) -> Result<Vec<ModelSummary>, CoreError> {
        let models = self.client
                         .select(Table::Models, &Query::all().eq("make_id", make_id).order_by("name", true))?;
        let ids: Vec<String> = models.iter().map(|m| text(m, "id")).collect();
        let procedures = if ids.is_empty() {
            Vec::new()
        } else {
            self.client
                .select(Table::Procedures, &Query::all().select(&["id", "model_id"]).is_in("model_id", ids))?
        };
        let counts = count_by(&procedures, "model_id");
        Ok(models.iter()
                 .map(|m| {
                     let id = text(m, "id");
                     ModelSummary { make_id: text(m, "make_id"),
                                    name: text(m, "name"),
                                    years: text(m, "years"),
                                    procedure_count: counts.get(&id).copied().unwrap_or(0),
                                    id }
                 })
                 .collect())
    }

    fn procedures(&self, scope: &ProcedureScope) -> Result<Vec<DisplayProcedure>, CoreError> {
        let makes = self.make_rows()?;
        let models = match scope {
            ProcedureScope::All => self.model_rows(None)?,
            ProcedureScope::Make(make_id) => self.model_rows(Some(std::slice::from_ref(make_id)))?,
            ProcedureScope::Model(key) => {
                let query = Query::all().eq("id", key.model_id.as_str()).eq("make_id", key.make_id.as_str());
                self.client.select(Table::Models, &query)?
            }
        };
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let model_ids: Vec<String> = models.iter().map(|m| text(m, "id")).collect();
        let rows = self.client
                       .select(Table::Procedures,
                               &Query::all().is_in("model_id", model_ids.iter().cloned()).order_by("title", true))?;

        // orden de catálogo: marca, modelo, título
        let make_pos: HashMap<String, usize> =
            makes.iter().enumerate().map(|(i, m)| (text(m, "id"), i)).collect();
        let model_pos: HashMap<String, (usize, usize)> =
            models.iter()
                  .enumerate()
                  .map(|(i, m)| {
                      let make = make_pos.get(&text(m, "make_id")).copied().unwrap_or(usize::MAX);
                      (text(m, "id"), (make, i))
                  })
                  .collect();
        let mut rows = rows;
        rows.sort_by_key(|r| model_pos.get(&text(r, "model_id")).copied().unwrap_or((usize::MAX, usize::MAX)));

        let out = self.compose_rows(rows, &models, &makes);
        debug!("remote procedures scope={scope:?} count={}", out.len());
        Ok(out)
    }

    fn procedure(&self, id: &str) -> Result<DisplayProcedure, CoreError> {
        let rows = self.client.select(Table::Procedures, &Query::all().eq("id", id))?;
        let row = rows.into_iter()
                      .next()
                      .ok_or_else(|| CoreError::not_found(format!("procedure '{id}'")))?;
        let models = self.client
                         .select(Table::Models, &Query::all().eq("id", text(&row, "model_id")))?;
        let makes = match models.first() {
            Some(m) => self.client.select(Table::Makes, &Query::all().eq("id", text(m, "make_id")))?,
            None => Vec::new(),
        };
        self.compose_rows(vec![row], &models, &makes)
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(format!("procedure '{id}'")))
    }

    fn add_make(&mut self, name: &str) -> Result<MakeSummary, CoreError> {
        let name = name.trim().to_string();
        autotech_domain::vehicle::validate_name("make", &name)?;
        self.ensure_name_free(Table::Makes, Query::all().eq("name", name.as_str()), None, &name)?;
        let row = MakeRow { name: name.clone(), logo_url: None };
        let id = new_id(insert_one(&self.client, Table::Makes, to_row(&row)?)?)?;
        info!("created make '{name}' id={id}");
        Ok(MakeSummary { id, name, model_count: 0 })
    }

    fn rename_make(&mut self, make_id: &str, new_name: &str) -> Result<(), CoreError> {
        let new_name = new_name.trim();
        autotech_domain::vehicle::validate_name("make", new_name)?;
        self.ensure_name_free(Table::Makes, Query::all().eq("name", new_name), Some(make_id), new_name)?;
        let mut patch = Row::new();
        patch.insert("name".into(), Value::from(new_name));
        update_one(&self.client, Table::Makes, make_id, patch).map(|_| ())
    }

    fn delete_make(&mut self, make_id: &str) -> Result<(), CoreError> {
        delete_one(&self.client, Table::Makes, make_id)
    }

    fn add_model(&mut self, make_id: &str, info: &ModelInfo) -> Result<ModelKey, CoreError> {
        let name = info.model.trim().to_string();
        autotech_domain::vehicle::validate_name("model", &name)?;
        let query = Query::all().eq("make_id", make_id).eq("name", name.as_str());
        self.ensure_name_free(Table::Models, query, None, &name)?;
        let row = ModelRow { make_id: make_id.to_string(),
                             name,
                             years: Some(info.years.trim().to_string()).filter(|y| !y.is_empty()) };
        let id = new_id(insert_one(&self.client, Table::Models, to_row(&row)?)?)?;
        Ok(ModelKey::new(make_id, &id))
    }

    fn update_model(&mut self, key: &ModelKey, info: &ModelInfo) -> Result<(), CoreError> {
        let name = info.model.trim().to_string();
        autotech_domain::vehicle::validate_name("model", &name)?;
        let query = Query::all().eq("make_id", key.make_id.as_str()).eq("name", name.as_str());
        self.ensure_name_free(Table::Models, query, Some(&key.model_id), &name)?;
        let patch = ModelPatch { name, years: Some(info.years.trim().to_string()).filter(|y| !y.is_empty()) };
        update_one(&self.client, Table::Models, &key.model_id, to_row(&patch)?).map(|_| ())
    }

    fn delete_model(&mut self, key: &ModelKey) -> Result<(), CoreError> {
        delete_one(&self.client, Table::Models, &key.model_id)
    }

    /// El almacén asigna el id; el `id` del procedimiento recibido se ignora.
    fn add_procedure(&mut self, key: &ModelKey, procedure: Procedure) -> Result<String, CoreError> {
        procedure.validate()?;
        let row = to_row(&ProcedureRow::from_procedure(&key.model_id, &procedure))?;
        let id = new_id(insert_one(&self.client, Table::Procedures, row)?)?;
        info!("created procedure '{}' id={id}", procedure.title);
        Ok(id)
    }

    fn update_procedure(&mut self, id: &str, procedure: Procedure) -> Result<(), CoreError> {
        procedure.validate()?;
        let mut patch = to_row(&ProcedureRow::from_procedure("", &procedure))?;
        patch.remove("model_id");
        patch.insert("updated_at".into(), serde_json::to_value(Utc::now())?);
        update_one(&self.client, Table::Procedures, id, patch).map(|_| ())
    }

    fn delete_procedure(&mut self, id: &str) -> Result<(), CoreError> {
        delete_one(&self.client, Table::Procedures, id)
    }
}

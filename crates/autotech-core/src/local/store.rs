//! Adaptador de persistencia local del catálogo (modo demo).
//!
//! Mantiene una copia editable del catálogo completo (marcas → modelos →
//! procedimientos) bajo una clave del almacén clave-valor. Se inicializa con
//! el catálogo semilla la primera vez.
//!
//! Garantías:
//! - Cada mutación se aplica sobre una copia y sólo se publica después de
//!   persistirla; si el almacén falla, el estado previo queda intacto.
//! - `import_data` nunca aplica un import parcial.
//! - No hay historial: los borrados sólo se deshacen con `reset_to_default`.
//! - Última escritura gana si dos instancias comparten la misma clave.

use autotech_domain::{Procedure, VehicleMake, VehicleModel};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kv::KeyValueStore;
use super::seed::seed_catalog;
use crate::CoreError;

pub const DEFAULT_STORAGE_KEY: &str = "vehicleData";

/// Datos editables de un modelo (sin sus procedimientos).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    #[serde(default)]
    pub years: String,
}

impl ModelInfo {
    pub fn new(model: &str, years: &str) -> Self {
        ModelInfo { model: model.to_string(), years: years.to_string() }
    }
}

pub struct LocalCatalogStore<S: KeyValueStore> {
    store: S,
    key: String,
    makes: Vec<VehicleMake>,
}

impl<S: KeyValueStore> LocalCatalogStore<S> {
    pub fn open(store: S) -> Result<Self, CoreError> {
        Self::open_with_key(store, DEFAULT_STORAGE_KEY)
    }

    /// Abre el catálogo guardado bajo `key`. Si no existe se siembra; si el
    /// contenido guardado está corrupto se usa la semilla (sin sobrescribir
    /// el valor corrupto hasta la primera mutación).
    pub fn open_with_key(store: S, key: &str) -> Result<Self, CoreError> {
        let makes = match store.get(key)? {
            Some(text) => match parse_catalog(&text) {
                Ok(makes) => makes,
                Err(e) => {
                    warn!("stored catalog under '{key}' is unreadable, falling back to seed: {e}");
                    seed_catalog()?
                }
            },
            None => {
                let seed = seed_catalog()?;
                store.set(key, &serde_json::to_string(&seed)?)?;
                debug!("seeded catalog under '{key}' makes={}", seed.len());
                seed
            }
        };
        Ok(LocalCatalogStore { store, key: key.to_string(), makes })
    }

    pub fn makes(&self) -> &[VehicleMake] {
        &self.makes
    }

    pub fn make(&self, name: &str) -> Option<&VehicleMake> {
        self.makes.iter().find(|m| m.make == name)
    }

    pub fn procedure(&self, id: &str) -> Option<(&VehicleMake, &VehicleModel, &Procedure)> {
        self.makes.iter().find_map(|make| {
                             make.models.iter().find_map(|model| {
                                                   model.procedures
                                                        .iter()
                                                        .find(|p| p.id == id)
                                                        .map(|p| (make, model, p))
                                               })
                         })
    }

    pub fn add_make(&mut self, name: &str) -> Result<(), CoreError> {
        let make = VehicleMake::new(name.trim());
        make.validate()?;
        self.mutate(|makes| {
                ensure_unique_make(makes, &make.make)?;
                makes.push(make);
                Ok(())
            })
    }

    pub fn update_make(&mut self, old_name: &str, new_name: &str) -> Result<(), CoreError> {
        let new_name = new_name.trim().to_string();
        autotech_domain::vehicle::validate_name("make", &new_name)?;
        self.mutate(|makes| {
                if old_name != new_name {
                    ensure_unique_make(makes, &new_name)?;
                }
                find_make(makes, old_name)?.make = new_name;
                Ok(())
            })
    }

    /// Elimina la marca con todos sus modelos y procedimientos.
    pub fn delete_make(&mut self, name: &str) -> Result<(), CoreError> {
        self.mutate(|makes| {
                let before = makes.len();
                makes.retain(|m| m.make != name);
                if makes.len() == before {
                    return Err(CoreError::not_found(format!("make '{name}'")));
                }
                Ok(())
            })?;
        info!("deleted make '{name}'");
        Ok(())
    }

    pub fn add_model(&mut self, make_name: &str, info: &ModelInfo) -> Result<(), CoreError> {
        let model = VehicleModel::new(info.model.trim(), info.years.trim());
        model.validate()?;
        self.mutate(|makes| {
                let make = find_make(makes, make_name)?;
                if make.model(&model.model).is_some() {
                    return Err(CoreError::Conflict(format!("model '{}' already exists in '{make_name}'", model.model)));
                }
                make.models.push(model);
                Ok(())
            })
    }

    /// Actualiza nombre y años conservando los procedimientos.
    pub fn update_model(&mut self, make_name: &str, old_model: &str, info: &ModelInfo) -> Result<(), CoreError> {
        let name = info.model.trim().to_string();
        autotech_domain::vehicle::validate_name("model", &name)?;
        self.mutate(|makes| {
                let make = find_make(makes, make_name)?;
                if old_model != name && make.model(&name).is_some() {
                    return Err(CoreError::Conflict(format!("model '{name}' already exists in '{make_name}'")));
                }
                let model = find_model(make, old_model)?;
                model.model = name;
                model.years = info.years.trim().to_string();
                Ok(())
            })
    }

    /// Elimina el modelo y sus procedimientos; sólo dentro de la marca indicada.
    pub fn delete_model(&mut self, make_name: &str, model_name: &str) -> Result<(), CoreError> {
        self.mutate(|makes| {
                let make = find_make(makes, make_name)?;
                let before = make.models.len();
                make.models.retain(|m| m.model != model_name);
                if make.models.len() == before {
                    return Err(CoreError::not_found(format!("model '{model_name}' in '{make_name}'")));
                }
                Ok(())
            })
    }

    pub fn add_procedure(&mut self, make_name: &str, model_name: &str, procedure: Procedure) -> Result<(), CoreError> {
        procedure.validate()?;
        self.mutate(|makes| {
                let model = find_model(find_make(makes, make_name)?, model_name)?;
                if model.procedures.iter().any(|p| p.id == procedure.id) {
                    return Err(CoreError::Conflict(format!("procedure id '{}' already exists", procedure.id)));
                }
                model.procedures.push(procedure);
                Ok(())
            })
    }

    /// Reemplaza el procedimiento `procedure_id` en su posición actual. El id
    /// se conserva: el de `procedure` se ignora.
    pub fn update_procedure(&mut self,
                            make_name: &str,
                            model_name: &str,
                            procedure_id: &str,
                            mut procedure: Procedure)
                            -> Result<(), CoreError> {
        procedure.validate()?;
        procedure.id = procedure_id.to_string();
        self.mutate(|makes| {
                let model = find_model(find_make(makes, make_name)?, model_name)?;
                let slot = model.procedures
                                .iter_mut()
                                .find(|p| p.id == procedure_id)
                                .ok_or_else(|| CoreError::not_found(format!("procedure '{procedure_id}'")))?;
                *slot = procedure;
                Ok(())
            })
    }

    pub fn delete_procedure(&mut self, make_name: &str, model_name: &str, procedure_id: &str) -> Result<(), CoreError> {
        self.mutate(|makes| {
                let model = find_model(find_make(makes, make_name)?, model_name)?;
                let before = model.procedures.len();
                model.procedures.retain(|p| p.id != procedure_id);
                if model.procedures.len() == before {
                    return Err(CoreError::not_found(format!("procedure '{procedure_id}'")));
                }
                Ok(())
            })
    }

    /// Catálogo completo como JSON legible (array de marcas).
    pub fn export_data(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.makes)?)
    }

    /// Reemplaza el catálogo completo. Ante JSON inválido, raíz que no es
    /// array o contenido que no pasa la validación, no toca nada.
    pub fn import_data(&mut self, text: &str) -> Result<(), CoreError> {
        let makes = match parse_catalog(text) {
            Ok(m) => m,
            Err(e) => {
                warn!("import rejected: {e}");
                return Err(e);
            }
        };
        let count = makes.len();
        self.commit(makes)?;
        info!("imported catalog makes={count}");
        Ok(())
    }

    pub fn reset_to_default(&mut self) -> Result<(), CoreError> {
        self.commit(seed_catalog()?)?;
        info!("catalog reset to seed");
        Ok(())
    }

    fn mutate<F>(&mut self, f: F) -> Result<(), CoreError>
        where F: FnOnce(&mut Vec<VehicleMake>) -> Result<(), CoreError>
    {
        let mut next = self.makes.clone();
        f(&mut next)?;
        self.commit(next)
    }

    fn commit(&mut self, next: Vec<VehicleMake>) -> Result<(), CoreError> {
        let text = serde_json::to_string(&next)?;
        self.store.set(&self.key, &text)?;
        self.makes = next;
        Ok(())
    }
}

/// Parsea el formato de exportación: array JSON de marcas.
pub fn parse_catalog(text: &str) -> Result<Vec<VehicleMake>, CoreError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CoreError::Import(format!("invalid JSON: {e}")))?;
    if !value.is_array() {
        return Err(CoreError::Import("root must be an array of makes".into()));
    }
    let makes: Vec<VehicleMake> =
        serde_json::from_value(value).map_err(|e| CoreError::Import(format!("invalid catalog shape: {e}")))?;
    for make in &makes {
        make.validate().map_err(|e| CoreError::Import(e.to_string()))?;
    }
    Ok(makes)
}

fn find_make<'a>(makes: &'a mut [VehicleMake], name: &str) -> Result<&'a mut VehicleMake, CoreError> {
    makes.iter_mut()
         .find(|m| m.make == name)
         .ok_or_else(|| CoreError::not_found(format!("make '{name}'")))
}

fn find_model<'a>(make: &'a mut VehicleMake, name: &str) -> Result<&'a mut VehicleModel, CoreError> {
    let make_name = make.make.clone();
    make.model_mut(name)
        .ok_or_else(|| CoreError::not_found(format!("model '{name}' in '{make_name}'")))
}

fn ensure_unique_make(makes: &[VehicleMake], name: &str) -> Result<(), CoreError> {
    if makes.iter().any(|m| m.make == name) {
        return Err(CoreError::Conflict(format!("make '{name}' already exists")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::InMemoryKeyValueStore;
    use std::sync::Arc;

    fn open() -> (Arc<InMemoryKeyValueStore>, LocalCatalogStore<Arc<InMemoryKeyValueStore>>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = LocalCatalogStore::open(kv.clone()).unwrap();
        (kv, store)
    }

    #[test]
    fn first_open_persists_the_seed() {
        let (kv, store) = open();
        assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_some());
        assert!(store.make("BMW").is_some());
    }

    #[test]
    fn mutations_survive_reopen() {
        let (kv, mut store) = open();
        store.add_make("Audi").unwrap();
        store.add_model("Audi", &ModelInfo::new("A4 (B8)", "2008-2015")).unwrap();
        let reopened = LocalCatalogStore::open(kv).unwrap();
        assert_eq!(reopened.make("Audi").unwrap().models[0].years, "2008-2015");
    }

    #[test]
    fn corrupt_storage_falls_back_to_seed() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        kv.set(DEFAULT_STORAGE_KEY, "{not json").unwrap();
        let store = LocalCatalogStore::open(kv).unwrap();
        assert!(store.make("BMW").is_some());
    }

    #[test]
    fn update_model_keeps_procedures() {
        let (_kv, mut store) = open();
        store.update_model("BMW", "3 Series (E90)", &ModelInfo::new("3 Series (E9x)", "2005-2013")).unwrap();
        let model = store.make("BMW").unwrap().model("3 Series (E9x)").unwrap();
        assert_eq!(model.procedures.len(), 2);
        assert!(store.make("BMW").unwrap().model("3 Series (E90)").is_none());
    }

    #[test]
    fn duplicate_names_are_conflicts() {
        let (_kv, mut store) = open();
        assert!(matches!(store.add_make("BMW"), Err(CoreError::Conflict(_))));
        assert!(matches!(store.update_make("Ford", "BMW"), Err(CoreError::Conflict(_))));
        assert!(store.add_make("   ").is_err());
    }

    #[test]
    fn unknown_targets_are_not_found() {
        let (_kv, mut store) = open();
        assert!(matches!(store.delete_make("Lada"), Err(CoreError::NotFound(_))));
        assert!(matches!(store.delete_model("Ford", "3 Series (E90)"), Err(CoreError::NotFound(_))));
        assert!(matches!(store.delete_procedure("BMW", "3 Series (E90)", "nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn update_procedure_replaces_in_place() {
        let (_kv, mut store) = open();
        let (_, _, original) = store.procedure("bmw-e90-akl").unwrap();
        let mut edited = original.clone();
        edited.time_minutes = 120;
        store.update_procedure("BMW", "3 Series (E90)", "bmw-e90-akl", edited).unwrap();
        let model = store.make("BMW").unwrap().model("3 Series (E90)").unwrap();
        assert_eq!(model.procedures[0].id, "bmw-e90-akl");
        assert_eq!(model.procedures[0].time_minutes, 120);
    }
}

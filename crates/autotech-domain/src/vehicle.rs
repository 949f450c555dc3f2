//! Marcas y modelos de vehículo.
//!
//! Existen dos representaciones:
//! - Anidada (`VehicleMake` → `VehicleModel` → `Procedure`): catálogo local de
//!   demo y formato de exportación/importación.
//! - Relacional (`Make`, `Model`): filas de las tablas `makes` y `models`.

use serde::{Deserialize, Serialize};

use crate::{DomainError, Procedure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleMake {
    pub make: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub models: Vec<VehicleModel>,
}

impl VehicleMake {
    pub fn new(name: &str) -> Self {
        VehicleMake { make: name.to_string(), logo: None, models: Vec::new() }
    }

    pub fn model(&self, name: &str) -> Option<&VehicleModel> {
        self.models.iter().find(|m| m.model == name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut VehicleModel> {
        self.models.iter_mut().find(|m| m.model == name)
    }

    /// Valida nombre y todo el contenido anidado.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name("make", &self.make)?;
        for model in &self.models {
            model.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub model: String,
    #[serde(default)]
    pub years: String,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl VehicleModel {
    pub fn new(name: &str, years: &str) -> Self {
        VehicleModel { model: name.to_string(), years: years.to_string(), procedures: Vec::new() }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name("model", &self.model)?;
        for p in &self.procedures {
            p.validate()?;
        }
        Ok(())
    }
}

/// Fila de `makes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Make {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Fila de `models`. `years` es texto libre ("2010-2017").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub make_id: String,
    pub name: String,
    #[serde(default)]
    pub years: Option<String>,
}

/// Nombre obligatorio (no vacío tras recortar).
pub fn validate_name(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} name is required")));
    }
    Ok(())
}

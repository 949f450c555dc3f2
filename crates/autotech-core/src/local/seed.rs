//! Catálogo semilla embebido en el binario.

use autotech_domain::VehicleMake;

use super::store::parse_catalog;
use crate::CoreError;

pub const SEED_JSON: &str = include_str!("seed/vehicle_data.json");

/// Catálogo de fábrica. Pasa por las mismas validaciones que un import.
pub fn seed_catalog() -> Result<Vec<VehicleMake>, CoreError> {
    parse_catalog(SEED_JSON)
}

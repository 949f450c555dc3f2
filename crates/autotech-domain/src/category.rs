//! Enumeraciones cerradas del catálogo: categoría de servicio y dificultad.
//!
//! Ambas se serializan con su forma textual estable (`key-programming`,
//! `hard`, ...). Un valor desconocido falla al deserializar, de modo que la
//! frontera de escritura (import, formularios, filas remotas) lo rechaza.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    KeyProgramming,
    EcuCloning,
    Dashboard,
    ImmoOff,
}

impl ServiceCategory {
    /// Orden canónico de presentación.
    pub const ALL: [ServiceCategory; 4] = [ServiceCategory::KeyProgramming,
                                           ServiceCategory::EcuCloning,
                                           ServiceCategory::Dashboard,
                                           ServiceCategory::ImmoOff];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::KeyProgramming => "key-programming",
            ServiceCategory::EcuCloning => "ecu-cloning",
            ServiceCategory::Dashboard => "dashboard",
            ServiceCategory::ImmoOff => "immo-off",
        }
    }

    /// Etiqueta legible para listados.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::KeyProgramming => "Key Programming",
            ServiceCategory::EcuCloning => "ECU Cloning",
            ServiceCategory::Dashboard => "Dashboard",
            ServiceCategory::ImmoOff => "IMMO Off",
        }
    }
}

impl FromStr for ServiceCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceCategory::ALL.iter()
                            .copied()
                            .find(|c| c.as_str() == s)
                            .ok_or_else(|| DomainError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard, Difficulty::Expert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl FromStr for Difficulty {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL.iter()
                       .copied()
                       .find(|d| d.as_str() == s)
                       .ok_or_else(|| DomainError::UnknownDifficulty(s.to_string()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_known_values_only() {
        assert_eq!("immo-off".parse::<ServiceCategory>().unwrap(), ServiceCategory::ImmoOff);
        assert_eq!("Key-Programming".parse::<ServiceCategory>(),
                   Err(DomainError::UnknownCategory("Key-Programming".into())));
    }

    #[test]
    fn serde_uses_wire_names() {
        let v = serde_json::to_value(ServiceCategory::EcuCloning).unwrap();
        assert_eq!(v, serde_json::json!("ecu-cloning"));
        let d: Result<Difficulty, _> = serde_json::from_value(serde_json::json!("insane"));
        assert!(d.is_err(), "dificultad desconocida debe rechazarse");
    }
}

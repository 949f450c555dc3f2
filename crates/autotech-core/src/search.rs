//! Motor de filtrado y búsqueda.
//!
//! Funciones puras, seguras para llamarse en cada pulsación:
//! 1. Categoría: si el filtro no es `all`, sólo procedimientos de esa categoría.
//! 2. Texto: si la consulta no es vacía, coincidencia por subcadena sin
//!    distinguir mayúsculas contra título, descripción, chip, marca, modelo o
//!    el nombre de cualquier herramienta.
//! 3. Filtro estable: se conserva el orden relativo de la entrada.

use autotech_domain::{Procedure, ServiceCategory, VehicleMake};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::display::{compose, DisplayProcedure, RawProcedure};
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(ServiceCategory),
}

impl FromStr for CategoryFilter {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(CategoryFilter::All);
        }
        Ok(CategoryFilter::Only(s.parse()?))
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(c) => f.write_str(c.as_str()),
        }
    }
}

impl CategoryFilter {
    pub fn accepts(&self, category: Option<ServiceCategory>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => category == Some(*c),
        }
    }
}

/// Lo que el motor necesita saber de un procedimiento.
pub trait Searchable {
    fn category(&self) -> Option<ServiceCategory>;
    /// Campos de texto contra los que se busca (incluye nombres de herramientas).
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for DisplayProcedure {
    fn category(&self) -> Option<ServiceCategory> {
        self.category
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.chip_type.as_deref());
        fields.extend(self.make_name.as_deref());
        fields.extend(self.model_name.as_deref());
        fields.extend(self.tools.iter().map(|t| t.name.as_str()));
        fields
    }
}

impl Searchable for Procedure {
    fn category(&self) -> Option<ServiceCategory> {
        Some(self.category)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.chip_type.as_deref());
        fields.extend(self.tools.iter().map(|t| t.name.as_str()));
        fields
    }
}

/// Predicado de coincidencia de texto. Consulta vacía coincide siempre.
pub fn matches_query<T: Searchable + ?Sized>(item: &T, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    item.search_fields().iter().any(|f| f.to_lowercase().contains(&needle))
}

/// Subconjunto visible, en el orden original.
pub fn filter_procedures<T: Searchable + Clone>(items: &[T], category: CategoryFilter, query: &str) -> Vec<T> {
    items.iter()
         .filter(|p| category.accepts(p.category()))
         .filter(|p| matches_query(*p, query))
         .cloned()
         .collect()
}

/// Alcance de vehículo sobre el catálogo anidado (por nombre).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleSelection {
    #[default]
    All,
    Make(String),
    Model { make: String, model: String },
}

/// Conjunto de trabajo para una selección: procedimientos compuestos con
/// nombre de marca y modelo, en orden de catálogo. Una selección que no
/// existe produce una lista vacía.
pub fn scoped_procedures(catalog: &[VehicleMake], selection: &VehicleSelection) -> Vec<DisplayProcedure> {
    let mut out = Vec::new();
    for make in catalog {
        let make_wanted = match selection {
            VehicleSelection::All => true,
            VehicleSelection::Make(m) | VehicleSelection::Model { make: m, .. } => &make.make == m,
        };
        if !make_wanted {
            continue;
        }
        for model in &make.models {
            if let VehicleSelection::Model { model: wanted, .. } = selection {
                if &model.model != wanted {
                    continue;
                }
            }
            out.extend(model.procedures.iter().map(|p| {
                                                   compose(RawProcedure::Local { procedure: p,
                                                                                 make_name: Some(&make.make),
                                                                                 model_name: Some(&model.model) })
                                               }));
        }
    }
    out
}

/// Cantidad de procedimientos por categoría (las cuatro siempre presentes).
pub fn category_counts<T: Searchable>(items: &[T]) -> Vec<(ServiceCategory, usize)> {
    ServiceCategory::ALL.iter()
                        .map(|c| (*c, items.iter().filter(|p| p.category() == Some(*c)).count()))
                        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayCost;
    use autotech_domain::Tool;

    fn proc(id: &str, category: ServiceCategory, title: &str) -> DisplayProcedure {
        DisplayProcedure { id: id.into(),
                           category: Some(category),
                           title: title.into(),
                           description: String::new(),
                           time_minutes: 30,
                           difficulty: None,
                           cost: DisplayCost::default(),
                           tools: vec![],
                           steps: vec![],
                           notes: vec![],
                           chip_type: None,
                           pin_code: None,
                           make_name: None,
                           model_name: None }
    }

    #[test]
    fn empty_input_and_empty_query() {
        let none: Vec<DisplayProcedure> = vec![];
        assert!(filter_procedures(&none, CategoryFilter::All, "x").is_empty());
        let items = vec![proc("a", ServiceCategory::Dashboard, "A"), proc("b", ServiceCategory::ImmoOff, "B")];
        assert_eq!(filter_procedures(&items, CategoryFilter::All, ""), items);
    }

    #[test]
    fn category_filter_is_stable() {
        let items = vec![proc("1", ServiceCategory::Dashboard, "A"),
                         proc("2", ServiceCategory::ImmoOff, "B"),
                         proc("3", ServiceCategory::Dashboard, "C")];
        let ids: Vec<String> = filter_procedures(&items, CategoryFilter::Only(ServiceCategory::Dashboard), "")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn query_matches_tools_and_names_case_insensitively() {
        let mut a = proc("a", ServiceCategory::EcuCloning, "Clone DME");
        a.tools = vec![Tool::required("Autel IM608")];
        let mut b = proc("b", ServiceCategory::EcuCloning, "Other");
        b.make_name = Some("Volkswagen".into());
        let items = vec![a, b];
        assert_eq!(filter_procedures(&items, CategoryFilter::All, "im608").len(), 1);
        assert_eq!(filter_procedures(&items, CategoryFilter::All, "VOLKS")[0].id, "b");
        assert!(filter_procedures(&items, CategoryFilter::All, "zzz").is_empty());
    }

    #[test]
    fn filter_is_idempotent() {
        let items = vec![proc("1", ServiceCategory::Dashboard, "Odometer"),
                         proc("2", ServiceCategory::Dashboard, "Cluster LCD"),
                         proc("3", ServiceCategory::KeyProgramming, "Odometer key")];
        let c = CategoryFilter::Only(ServiceCategory::Dashboard);
        let once = filter_procedures(&items, c, "odo");
        assert_eq!(filter_procedures(&once, c, "odo"), once);
    }

    #[test]
    fn category_filter_parsing() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("ecu-cloning".parse::<CategoryFilter>().unwrap(),
                   CategoryFilter::Only(ServiceCategory::EcuCloning));
        assert!("everything".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn counts_cover_all_categories() {
        let items = vec![proc("1", ServiceCategory::Dashboard, "A"), proc("2", ServiceCategory::Dashboard, "B")];
        let counts = category_counts(&items);
        assert_eq!(counts.len(), 4);
        assert!(counts.contains(&(ServiceCategory::Dashboard, 2)));
        assert!(counts.contains(&(ServiceCategory::ImmoOff, 0)));
    }
}

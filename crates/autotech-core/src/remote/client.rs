//! Contrato genérico con el almacén relacional remoto.
//!
//! El core sólo necesita cuatro capacidades: seleccionar filas con filtros de
//! igualdad/inclusión y orden, insertar, actualizar y borrar por filtro. Las
//! filas viajan como objetos JSON con nombres de columna snake_case.
//!
//! Semántica de concurrencia: última escritura gana. No hay versionado ni
//! detección de conflictos entre sesiones que editan la misma entidad.
//! Los borrados de un padre confían en la configuración de integridad
//! referencial del almacén (`ON DELETE CASCADE`); el cliente emite una sola
//! llamada.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::CoreError;

/// Fila remota: objeto JSON columna → valor.
pub type Row = Map<String, Value>;

/// Tablas del esquema remoto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Makes,
    Models,
    Procedures,
    ProcedureVariants,
    ToolGuides,
    LinkedProcedures,
    ProcedureFeedback,
    Profiles,
    UserRoles,
}

impl Table {
    pub const ALL: [Table; 9] = [Table::Makes,
                                 Table::Models,
                                 Table::Procedures,
                                 Table::ProcedureVariants,
                                 Table::ToolGuides,
                                 Table::LinkedProcedures,
                                 Table::ProcedureFeedback,
                                 Table::Profiles,
                                 Table::UserRoles];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Makes => "makes",
            Table::Models => "models",
            Table::Procedures => "procedures",
            Table::ProcedureVariants => "procedure_variants",
            Table::ToolGuides => "tool_guides",
            Table::LinkedProcedures => "linked_procedures",
            Table::ProcedureFeedback => "procedure_feedback",
            Table::Profiles => "profiles",
            Table::UserRoles => "user_roles",
        }
    }

    /// Columnas conocidas. Cualquier otra se rechaza antes de tocar el
    /// almacén (también protege la construcción dinámica de SQL).
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Makes => &["id", "name", "logo_url", "created_at"],
            Table::Models => &["id", "make_id", "name", "years", "created_at"],
            Table::Procedures => &["id", "model_id", "title", "description", "category", "difficulty", "time_minutes",
                                   "cost_min", "cost_max", "tools", "steps", "notes", "chip_type", "pin_code",
                                   "created_at", "updated_at"],
            Table::ProcedureVariants => &["id", "procedure_id", "variant_name", "hardware_type", "notes", "created_at"],
            Table::ToolGuides => &["id", "variant_id", "tool_name", "steps", "notes", "created_at"],
            Table::LinkedProcedures => &["id", "procedure_id", "linked_procedure_id", "relationship", "created_at"],
            Table::ProcedureFeedback => &["id", "procedure_id", "variant_id", "user_id", "content", "feedback_type",
                                          "status", "admin_notes", "created_at", "reviewed_at"],
            Table::Profiles => &["id", "email", "full_name", "avatar_url", "created_at", "updated_at"],
            Table::UserRoles => &["id", "user_id", "role", "created_at"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    pub fn check_column(&self, column: &str) -> Result<(), CoreError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CoreError::Storage(format!("unknown column {}.{}", self.name(), column)))
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IN (values)`
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) => c,
        }
    }

    /// Evalúa el filtro contra una fila ya materializada.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, expected) => actual == expected,
            Filter::In(_, options) => options.iter().any(|o| o == actual),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Consulta de selección: proyección opcional, filtros (AND), orden y límite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Query::default()
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
        where I: IntoIterator<Item = V>,
              V: Into<Value>
    {
        self.filters.push(Filter::In(column.to_string(), values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order { column: column.to_string(), ascending });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Verifica que todas las columnas referenciadas existan en la tabla.
    pub fn check(&self, table: Table) -> Result<(), CoreError> {
        for c in self.columns.iter().flatten() {
            table.check_column(c)?;
        }
        for f in &self.filters {
            table.check_column(f.column())?;
        }
        for o in &self.order {
            table.check_column(&o.column)?;
        }
        Ok(())
    }
}

/// Capacidades mínimas del almacén remoto.
///
/// Contrato común a todas las implementaciones:
/// - `update` y `delete` exigen al menos un filtro.
/// - Columnas desconocidas → `CoreError::Storage`.
/// - Violaciones de integridad (FK inexistente, duplicados) → `CoreError::Conflict`.
pub trait RemoteDataClient: Send + Sync {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, CoreError>;
    /// Inserta filas y devuelve las filas completas (con `id` y defaults).
    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, CoreError>;
    /// Aplica `patch` a las filas que cumplen `filters`; devuelve las filas actualizadas.
    fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, CoreError>;
    /// Borra las filas que cumplen `filters`; devuelve cuántas.
    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, CoreError>;
}

impl<T: RemoteDataClient + ?Sized> RemoteDataClient for Arc<T> {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, CoreError> {
        (**self).select(table, query)
    }
    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, CoreError> {
        (**self).insert(table, rows)
    }
    fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, CoreError> {
        (**self).update(table, patch, filters)
    }
    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, CoreError> {
        (**self).delete(table, filters)
    }
}

impl<T: RemoteDataClient + ?Sized> RemoteDataClient for &T {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, CoreError> {
        (**self).select(table, query)
    }
    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, CoreError> {
        (**self).insert(table, rows)
    }
    fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, CoreError> {
        (**self).update(table, patch, filters)
    }
    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, CoreError> {
        (**self).delete(table, filters)
    }
}

/// Convierte un payload serializable en `Row`. Sólo objetos JSON son filas.
pub fn to_row<T: serde::Serialize>(value: &T) -> Result<Row, CoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::Storage(format!("row payload must be an object, got {other}"))),
    }
}

/// Lee una columna de texto de una fila (vacío si falta o no es texto).
pub fn text(row: &Row, column: &str) -> String {
    row.get(column).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Inserta una fila y devuelve la fila completa que guardó el almacén.
pub fn insert_one<C: RemoteDataClient + ?Sized>(client: &C, table: Table, row: Row) -> Result<Row, CoreError> {
    client.insert(table, vec![row])?
          .into_iter()
          .next()
          .ok_or_else(|| CoreError::Storage(format!("insert into {table} returned no row")))
}

/// Actualiza por `id`; `NotFound` si ninguna fila coincide.
pub fn update_one<C: RemoteDataClient + ?Sized>(client: &C, table: Table, id: &str, patch: Row)
                                                -> Result<Row, CoreError> {
    client.update(table, patch, &[Filter::eq("id", id)])?
          .into_iter()
          .next()
          .ok_or_else(|| CoreError::not_found(format!("{table} '{id}'")))
}

/// Borra por `id`; `NotFound` si ninguna fila coincide.
pub fn delete_one<C: RemoteDataClient + ?Sized>(client: &C, table: Table, id: &str) -> Result<(), CoreError> {
    if client.delete(table, &[Filter::eq("id", id)])? == 0 {
        return Err(CoreError::not_found(format!("{table} '{id}'")));
    }
    log::info!("deleted {table} '{id}'");
    Ok(())
}

/// `update`/`delete` sin filtros o con columnas desconocidas → `Storage`.
pub fn guard_filters(op: &str, table: Table, filters: &[Filter]) -> Result<(), CoreError> {
    if filters.is_empty() {
        return Err(CoreError::Storage(format!("{op} on {table} requires at least one filter")));
    }
    for f in filters {
        table.check_column(f.column())?;
    }
    Ok(())
}

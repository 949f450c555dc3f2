//! Backend en memoria del cliente remoto.
//!
//! Reproduce el comportamiento observable del almacén relacional: ids y
//! timestamps por defecto, integridad referencial con borrado en cascada,
//! claves únicas y orden de inserción estable. Sirve para tests y para la
//! demo sin base de datos.

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::client::{guard_filters, Filter, Query, RemoteDataClient, Row, Table};
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub table: Table,
    pub column: &'static str,
    pub references: Table,
    pub on_delete: OnDelete,
}

/// Misma configuración que declaran las migraciones SQL.
pub const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey { table: Table::Models, column: "make_id", references: Table::Makes, on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::Procedures, column: "model_id", references: Table::Models, on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::ProcedureVariants,
                 column: "procedure_id",
                 references: Table::Procedures,
                 on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::ToolGuides,
                 column: "variant_id",
                 references: Table::ProcedureVariants,
                 on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::LinkedProcedures,
                 column: "procedure_id",
                 references: Table::Procedures,
                 on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::LinkedProcedures,
                 column: "linked_procedure_id",
                 references: Table::Procedures,
                 on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::ProcedureFeedback,
                 column: "procedure_id",
                 references: Table::Procedures,
                 on_delete: OnDelete::Cascade },
    ForeignKey { table: Table::ProcedureFeedback,
                 column: "variant_id",
                 references: Table::ProcedureVariants,
                 on_delete: OnDelete::SetNull },
];

/// Claves únicas compuestas.
pub const UNIQUE_KEYS: &[(Table, &[&str])] = &[(Table::LinkedProcedures, &["procedure_id", "linked_procedure_id"]),
                                               (Table::UserRoles, &["user_id", "role"])];

type Tables = HashMap<Table, IndexMap<String, Row>>;

#[derive(Default)]
pub struct InMemoryDataClient {
    tables: RwLock<Tables>,
}

impl InMemoryDataClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cantidad de filas de una tabla (diagnóstico / tests).
    pub fn count(&self, table: Table) -> usize {
        self.tables
            .read()
            .map(|t| t.get(&table).map(IndexMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, CoreError> {
        self.tables.write().map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Default que el esquema SQL asigna a una columna omitida en el INSERT.
fn column_default(table: Table, column: &str) -> Option<Value> {
    match (table, column) {
        (_, "id") => Some(Value::String(Uuid::new_v4().to_string())),
        (_, "created_at") | (Table::Procedures, "updated_at") | (Table::Profiles, "updated_at") => Some(now()),
        (Table::Procedures, "difficulty") => Some(Value::from("medium")),
        (Table::Procedures, "tools" | "steps" | "notes")
        | (Table::ProcedureVariants, "notes")
        | (Table::ToolGuides, "steps" | "notes") => Some(Value::Array(vec![])),
        (Table::LinkedProcedures, "relationship") => Some(Value::from("related")),
        (Table::ProcedureFeedback, "status") => Some(Value::from("pending")),
        (Table::ProcedureFeedback, "feedback_type") => Some(Value::from("tip")),
        _ => None,
    }
}

// Columnas no informadas toman su default o quedan en null, como en SQL.
fn apply_defaults(table: Table, row: &mut Row) {
    for col in table.columns() {
        if !row.contains_key(*col) {
            row.insert(col.to_string(), column_default(table, col).unwrap_or(Value::Null));
        }
    }
}

fn check_integrity(tables: &Tables, table: Table, row: &Row, skip_id: Option<&str>) -> Result<(), CoreError> {
    for fk in FOREIGN_KEYS.iter().filter(|fk| fk.table == table) {
        match row.get(fk.column) {
            None | Some(Value::Null) => {}
            Some(Value::String(parent)) => {
                let exists = tables.get(&fk.references).map(|t| t.contains_key(parent)).unwrap_or(false);
                if !exists {
                    return Err(CoreError::Conflict(format!("foreign key violation: {}.{} -> {} ({parent})",
                                                           table, fk.column, fk.references)));
                }
            }
            Some(other) => {
                return Err(CoreError::Conflict(format!("foreign key {}.{} must be text, got {other}", table, fk.column)))
            }
        }
    }
    if table == Table::LinkedProcedures && row.get("procedure_id") == row.get("linked_procedure_id") {
        return Err(CoreError::Conflict("check violation: procedure cannot link to itself".into()));
    }
    for (t, cols) in UNIQUE_KEYS.iter().filter(|(t, _)| *t == table) {
        let rows = match tables.get(t) {
            Some(rows) => rows,
            None => continue,
        };
        let duplicate = rows.iter()
                            .filter(|(id, _)| Some(id.as_str()) != skip_id)
                            .any(|(_, other)| cols.iter().all(|c| other.get(*c) == row.get(*c)));
        if duplicate {
            return Err(CoreError::Conflict(format!("unique violation on {}({})", t, cols.join(", "))));
        }
    }
    Ok(())
}

/// Claves únicas y primarias contra las filas anteriores del mismo lote.
fn check_batch(table: Table, row: &Row, pending: &[Row]) -> Result<(), CoreError> {
    if pending.iter().any(|other| other.get("id") == row.get("id")) {
        return Err(CoreError::Conflict(format!("duplicate primary key {}.id in batch", table)));
    }
    for (_, cols) in UNIQUE_KEYS.iter().filter(|(t, _)| *t == table) {
        if pending.iter().any(|other| cols.iter().all(|c| other.get(*c) == row.get(*c))) {
            return Err(CoreError::Conflict(format!("unique violation on {}({})", table, cols.join(", "))));
        }
    }
    Ok(())
}

/// Orden compatible con Postgres: NULLS LAST en ASC y NULLS FIRST en DESC.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

fn delete_cascading(tables: &mut Tables, table: Table, filters: &[Filter]) -> usize {
    let ids: Vec<String> = match tables.get(&table) {
        Some(rows) => rows.iter()
                          .filter(|(_, r)| filters.iter().all(|f| f.matches(r)))
                          .map(|(id, _)| id.clone())
                          .collect(),
        None => return 0,
    };
    if ids.is_empty() {
        return 0;
    }
    if let Some(rows) = tables.get_mut(&table) {
        rows.retain(|id, _| !ids.contains(id));
    }
    let id_values: Vec<Value> = ids.iter().cloned().map(Value::String).collect();
    for fk in FOREIGN_KEYS.iter().filter(|fk| fk.references == table) {
        let child_filter = [Filter::In(fk.column.to_string(), id_values.clone())];
        match fk.on_delete {
            OnDelete::Cascade => {
                let n = delete_cascading(tables, fk.table, &child_filter);
                if n > 0 {
                    debug!("cascade delete {} -> {} rows={n}", table, fk.table);
                }
            }
            OnDelete::SetNull => {
                if let Some(rows) = tables.get_mut(&fk.table) {
                    for row in rows.values_mut().filter(|r| child_filter[0].matches(r)) {
                        row.insert(fk.column.to_string(), Value::Null);
                    }
                }
            }
        }
    }
    ids.len()
}

impl RemoteDataClient for InMemoryDataClient {
    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, CoreError> {
        query.check(table)?;
        let guard = self.tables.read().map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))?;
        let mut rows: Vec<Row> = guard.get(&table)
                                      .into_iter()
                                      .flat_map(|t| t.values())
                                      .filter(|r| query.filters.iter().all(|f| f.matches(r)))
                                      .cloned()
                                      .collect();
        drop(guard);
        // sort_by es estable: empates conservan el orden de inserción.
        rows.sort_by(|a, b| {
                for o in &query.order {
                    let va = a.get(&o.column).unwrap_or(&Value::Null);
                    let vb = b.get(&o.column).unwrap_or(&Value::Null);
                    let ord = compare(va, vb);
                    let ord = if o.ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        if let Some(n) = query.limit {
            rows.truncate(n);
        }
        if let Some(cols) = &query.columns {
            for r in rows.iter_mut() {
                r.retain(|k, _| cols.iter().any(|c| c == k));
            }
        }
        Ok(rows)
    }

    fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, CoreError> {
        let mut guard = self.write()?;
        let mut prepared = Vec::with_capacity(rows.len());
        for mut row in rows {
            for k in row.keys() {
                table.check_column(k)?;
            }
            apply_defaults(table, &mut row);
            check_integrity(&guard, table, &row, None)?;
            check_batch(table, &row, &prepared)?;
            prepared.push(row);
        }
        // Todas las filas validadas antes de escribir: la inserción es atómica.
        let target = guard.entry(table).or_default();
        for row in &prepared {
            let id = row.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            if target.contains_key(&id) {
                return Err(CoreError::Conflict(format!("duplicate primary key {}.id={id}", table)));
            }
        }
        for row in &prepared {
            let id = row.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            target.insert(id, row.clone());
        }
        debug!("insert table={} rows={}", table, prepared.len());
        Ok(prepared)
    }

    fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, CoreError> {
        guard_filters("update", table, filters)?;
        for k in patch.keys() {
            table.check_column(k)?;
        }
        let mut guard = self.write()?;
        let matching: Vec<(String, Row)> = guard.get(&table)
                                                .into_iter()
                                                .flat_map(|t| t.iter())
                                                .filter(|(_, r)| filters.iter().all(|f| f.matches(r)))
                                                .map(|(id, r)| {
                                                    let mut next = r.clone();
                                                    for (k, v) in &patch {
                                                        next.insert(k.clone(), v.clone());
                                                    }
                                                    if table == Table::Procedures && !patch.contains_key("updated_at") {
                                                        next.insert("updated_at".into(), now());
                                                    }
                                                    (id.clone(), next)
                                                })
                                                .collect();
        for (id, next) in &matching {
            check_integrity(&guard, table, next, Some(id))?;
        }
        let target = guard.entry(table).or_default();
        for (id, next) in &matching {
            target.insert(id.clone(), next.clone());
        }
        debug!("update table={} rows={}", table, matching.len());
        Ok(matching.into_iter().map(|(_, r)| r).collect())
    }

    fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, CoreError> {
        guard_filters("delete", table, filters)?;
        let mut guard = self.write()?;
        let n = delete_cascading(&mut guard, table, filters);
        debug!("delete table={} rows={n}", table);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::to_row;
    use serde_json::json;

    fn insert_one(c: &InMemoryDataClient, table: Table, v: Value) -> String {
        let rows = c.insert(table, vec![to_row(&v).unwrap()]).unwrap();
        rows[0]["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn insert_assigns_defaults() {
        let c = InMemoryDataClient::new();
        let rows = c.insert(Table::Makes, vec![to_row(&json!({"name": "BMW"})).unwrap()]).unwrap();
        assert!(rows[0]["id"].is_string());
        assert!(rows[0]["created_at"].is_string());
        assert_eq!(rows[0]["logo_url"], Value::Null);
    }

    #[test]
    fn delete_cascades_through_the_hierarchy() {
        let c = InMemoryDataClient::new();
        let make = insert_one(&c, Table::Makes, json!({"name": "BMW"}));
        let model = insert_one(&c, Table::Models, json!({"make_id": make, "name": "E90"}));
        let p1 = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "A", "category": "dashboard"}));
        let p2 = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "B", "category": "immo-off"}));
        let variant = insert_one(&c, Table::ProcedureVariants, json!({"procedure_id": p1, "variant_name": "NEC"}));
        insert_one(&c, Table::ToolGuides, json!({"variant_id": variant, "tool_name": "VVDI"}));
        insert_one(&c, Table::LinkedProcedures, json!({"procedure_id": p2, "linked_procedure_id": p1}));

        assert_eq!(c.delete(Table::Makes, &[Filter::eq("id", make.as_str())]).unwrap(), 1);
        for t in [Table::Models, Table::Procedures, Table::ProcedureVariants, Table::ToolGuides, Table::LinkedProcedures] {
            assert_eq!(c.count(t), 0, "tabla {t} debe quedar vacía");
        }
    }

    #[test]
    fn feedback_variant_is_nulled_not_deleted() {
        let c = InMemoryDataClient::new();
        let make = insert_one(&c, Table::Makes, json!({"name": "VW"}));
        let model = insert_one(&c, Table::Models, json!({"make_id": make, "name": "Golf"}));
        let p = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "A", "category": "dashboard"}));
        let v = insert_one(&c, Table::ProcedureVariants, json!({"procedure_id": p, "variant_name": "VDO"}));
        insert_one(&c,
                   Table::ProcedureFeedback,
                   json!({"procedure_id": p, "variant_id": v, "user_id": "u1", "content": "useful tip here"}));
        c.delete(Table::ProcedureVariants, &[Filter::eq("id", v.as_str())]).unwrap();
        let rows = c.select(Table::ProcedureFeedback, &Query::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["variant_id"], Value::Null);
        assert_eq!(rows[0]["status"], json!("pending"));
    }

    #[test]
    fn integrity_violations_are_conflicts() {
        let c = InMemoryDataClient::new();
        let err = c.insert(Table::Models, vec![to_row(&json!({"make_id": "nope", "name": "X"})).unwrap()]);
        assert!(matches!(err, Err(CoreError::Conflict(_))));

        let make = insert_one(&c, Table::Makes, json!({"name": "Ford"}));
        let model = insert_one(&c, Table::Models, json!({"make_id": make, "name": "Focus"}));
        let a = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "A", "category": "dashboard"}));
        let b = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "B", "category": "dashboard"}));
        insert_one(&c, Table::LinkedProcedures, json!({"procedure_id": a, "linked_procedure_id": b}));
        let dup = c.insert(Table::LinkedProcedures,
                           vec![to_row(&json!({"procedure_id": a, "linked_procedure_id": b})).unwrap()]);
        assert!(matches!(dup, Err(CoreError::Conflict(_))));
        let selfie = c.insert(Table::LinkedProcedures,
                              vec![to_row(&json!({"procedure_id": a, "linked_procedure_id": a})).unwrap()]);
        assert!(matches!(selfie, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn duplicates_inside_one_batch_are_rejected_atomically() {
        let c = InMemoryDataClient::new();
        let make = insert_one(&c, Table::Makes, json!({"name": "Ford"}));
        let model = insert_one(&c, Table::Models, json!({"make_id": make, "name": "Focus"}));
        let a = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "A", "category": "dashboard"}));
        let b = insert_one(&c, Table::Procedures, json!({"model_id": model, "title": "B", "category": "dashboard"}));
        let link = json!({"procedure_id": a, "linked_procedure_id": b});
        let batch = vec![to_row(&link).unwrap(), to_row(&link).unwrap()];
        assert!(matches!(c.insert(Table::LinkedProcedures, batch), Err(CoreError::Conflict(_))));
        assert_eq!(c.count(Table::LinkedProcedures), 0);

        let row = to_row(&json!({"id": "m-1", "name": "Opel"})).unwrap();
        assert!(matches!(c.insert(Table::Makes, vec![row.clone(), row]), Err(CoreError::Conflict(_))));
        assert_eq!(c.count(Table::Makes), 1);
    }

    #[test]
    fn select_orders_filters_and_projects() {
        let c = InMemoryDataClient::new();
        for name in ["Toyota", "BMW", "Ford"] {
            insert_one(&c, Table::Makes, json!({"name": name}));
        }
        let rows = c.select(Table::Makes, &Query::all().select(&["name"]).order_by("name", true)).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["BMW", "Ford", "Toyota"]);
        assert_eq!(rows[0].len(), 1);
        let desc = c.select(Table::Makes, &Query::all().order_by("name", false).limit(1)).unwrap();
        assert_eq!(desc[0]["name"], json!("Toyota"));
    }

    #[test]
    fn update_and_delete_require_filters() {
        let c = InMemoryDataClient::new();
        assert!(c.delete(Table::Makes, &[]).is_err());
        assert!(c.update(Table::Makes, Row::new(), &[]).is_err());
    }
}

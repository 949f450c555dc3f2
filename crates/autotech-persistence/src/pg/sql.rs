//! Construcción de sentencias SQL a partir de `Query`/`Filter`.
//!
//! Los valores nunca se interpolan: cada valor viaja como parámetro `jsonb`
//! y se compara contra `to_jsonb(columna)`, así el mismo camino sirve para
//! uuid, texto, enteros y timestamps. Los nombres de tabla y columna salen
//! de la lista blanca de `Table`.

use autotech_core::remote::{guard_filters, Filter, Query, Row, Table};
use autotech_core::CoreError;
use serde_json::Value;

/// Sentencia lista para ejecutar: SQL con `$n` y sus parámetros jsonb en orden.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

/// Cláusula WHERE (vacía si no hay filtros). Los parámetros empiezan en `first`.
fn where_clause(filters: &[Filter], first: usize, binds: &mut Vec<Value>) -> String {
    let mut parts = Vec::with_capacity(filters.len());
    for f in filters {
        let col = format!("t.{}", quote(f.column()));
        match f {
            Filter::Eq(_, Value::Null) => parts.push(format!("{col} IS NULL")),
            Filter::Eq(_, v) => {
                binds.push(v.clone());
                parts.push(format!("to_jsonb({col}) = ${}", first + binds.len() - 1));
            }
            Filter::In(_, options) if options.is_empty() => parts.push("FALSE".to_string()),
            Filter::In(_, options) => {
                binds.push(Value::Array(options.clone()));
                parts.push(format!("${} @> jsonb_build_array(to_jsonb({col}))", first + binds.len() - 1));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

pub fn select(table: Table, query: &Query) -> Result<Statement, CoreError> {
    query.check(table)?;
    let mut binds = Vec::new();
    let mut sql = format!("SELECT to_jsonb(t) AS data FROM {} AS t", quote(table.name()));
    sql.push_str(&where_clause(&query.filters, 1, &mut binds));
    if !query.order.is_empty() {
        let order: Vec<String> = query.order
                                      .iter()
                                      .map(|o| {
                                          format!("t.{} {}",
                                                  quote(&o.column),
                                                  if o.ascending { "ASC" } else { "DESC" })
                                      })
                                      .collect();
        sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }
    if let Some(n) = query.limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
    Ok(Statement { sql, binds })
}

/// Inserta una fila. Las columnas ausentes toman su DEFAULT.
pub fn insert(table: Table, row: &Row) -> Result<Statement, CoreError> {
    let name = quote(table.name());
    if row.is_empty() {
        return Ok(Statement { sql: format!("INSERT INTO {name} AS t DEFAULT VALUES RETURNING to_jsonb(t) AS data"),
                              binds: Vec::new() });
    }
    let mut cols = Vec::with_capacity(row.len());
    for c in row.keys() {
        table.check_column(c)?;
        cols.push(quote(c));
    }
    let source: Vec<String> = cols.iter().map(|c| format!("r.{c}")).collect();
    let sql = format!("INSERT INTO {name} AS t ({}) SELECT {} FROM jsonb_populate_record(NULL::{name}, $1) AS r \
                       RETURNING to_jsonb(t) AS data",
                      cols.join(", "),
                      source.join(", "));
    Ok(Statement { sql, binds: vec![Value::Object(row.clone())] })
}

pub fn update(table: Table, patch: &Row, filters: &[Filter]) -> Result<Statement, CoreError> {
    guard_filters("update", table, filters)?;
    if patch.is_empty() {
        return Err(CoreError::Storage(format!("update on {table} with an empty patch")));
    }
    let mut sets = Vec::with_capacity(patch.len());
    for c in patch.keys() {
        table.check_column(c)?;
        sets.push(format!("{0} = r.{0}", quote(c)));
    }
    let name = quote(table.name());
    let mut binds = vec![Value::Object(patch.clone())];
    let mut sql = format!("UPDATE {name} AS t SET {} FROM jsonb_populate_record(NULL::{name}, $1) AS r",
                          sets.join(", "));
    sql.push_str(&where_clause(filters, 2, &mut binds));
    sql.push_str(" RETURNING to_jsonb(t) AS data");
    Ok(Statement { sql, binds })
}

pub fn delete(table: Table, filters: &[Filter]) -> Result<Statement, CoreError> {
    guard_filters("delete", table, filters)?;
    let mut binds = Vec::new();
    let mut sql = format!("DELETE FROM {} AS t", quote(table.name()));
    sql.push_str(&where_clause(filters, 1, &mut binds));
    Ok(Statement { sql, binds })
}

/// Aplica la proyección de la consulta sobre una fila completa.
pub fn project(query: &Query, mut row: Row) -> Row {
    if let Some(cols) = &query.columns {
        row.retain(|k, _| cols.iter().any(|c| c == k));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotech_core::remote::to_row;
    use serde_json::json;

    #[test]
    fn select_binds_values_in_order() {
        let q = Query::all().eq("procedure_id", "p1")
                            .eq("variant_id", Value::Null)
                            .is_in("status", ["pending", "approved"])
                            .order_by("created_at", false)
                            .limit(5);
        let st = select(Table::ProcedureFeedback, &q).unwrap();
        assert_eq!(st.sql,
                   "SELECT to_jsonb(t) AS data FROM \"procedure_feedback\" AS t WHERE to_jsonb(t.\"procedure_id\") = $1 \
                    AND t.\"variant_id\" IS NULL AND $2 @> jsonb_build_array(to_jsonb(t.\"status\")) \
                    ORDER BY t.\"created_at\" DESC LIMIT 5");
        assert_eq!(st.binds, vec![json!("p1"), json!(["pending", "approved"])]);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let q = Query::all().is_in("id", Vec::<String>::new());
        assert!(select(Table::Procedures, &q).unwrap().sql.ends_with("WHERE FALSE"));
    }

    #[test]
    fn unknown_columns_never_reach_sql() {
        let q = Query::all().eq("name; DROP TABLE makes", "x");
        assert!(select(Table::Makes, &q).is_err());
        let row = to_row(&json!({"nombre": "BMW"})).unwrap();
        assert!(insert(Table::Makes, &row).is_err());
    }

    #[test]
    fn insert_populates_only_given_columns() {
        let row = to_row(&json!({"name": "BMW"})).unwrap();
        let st = insert(Table::Makes, &row).unwrap();
        assert!(st.sql.starts_with("INSERT INTO \"makes\" AS t (\"name\") SELECT r.\"name\""));
        assert_eq!(st.binds, vec![json!({"name": "BMW"})]);
        assert!(insert(Table::UserRoles, &Row::new()).unwrap().sql.contains("DEFAULT VALUES"));
    }

    #[test]
    fn update_and_delete_require_filters() {
        let patch = to_row(&json!({"name": "Mini"})).unwrap();
        assert!(update(Table::Makes, &patch, &[]).is_err());
        assert!(update(Table::Makes, &Row::new(), &[Filter::eq("id", "m")]).is_err());
        assert!(delete(Table::Makes, &[]).is_err());

        let st = update(Table::Makes, &patch, &[Filter::eq("id", "m")]).unwrap();
        assert!(st.sql.contains("SET \"name\" = r.\"name\""));
        assert!(st.sql.contains("WHERE to_jsonb(t.\"id\") = $2 RETURNING"));
        assert_eq!(st.binds.len(), 2);
    }

    #[test]
    fn projection_keeps_requested_columns() {
        let row = to_row(&json!({"id": "1", "name": "BMW", "logo_url": null})).unwrap();
        let projected = project(&Query::all().select(&["id"]), row.clone());
        assert_eq!(projected.len(), 1);
        assert_eq!(project(&Query::all(), row).len(), 3);
    }
}

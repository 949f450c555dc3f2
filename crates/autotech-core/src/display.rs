//! Composición de la vista de procedimiento.
//!
//! Los procedimientos llegan con dos formas:
//! - Catálogo local: `Procedure` tipado, pasos y notas como texto.
//! - Filas remotas: JSON donde cada paso puede ser texto u objeto
//!   `{title, description}` y cada nota texto u objeto `{content}`.
//!
//! `compose` normaliza ambas a `DisplayProcedure` una única vez, en la
//! frontera de acceso a datos. Es total: nunca falla y sustituye valores
//! ausentes o inválidos por defaults seguros (texto vacío, 0, lista vacía).

use autotech_domain::{Difficulty, Procedure, ServiceCategory, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayCost {
    pub min: u32,
    pub max: u32,
}

/// Forma canónica que consume toda la presentación.
///
/// `category`/`difficulty` son `None` sólo cuando una fila remota trae un
/// valor fuera de las enumeraciones (nunca ocurre con datos escritos por
/// este sistema, que las valida al escribir).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProcedure {
    pub id: String,
    pub category: Option<ServiceCategory>,
    pub title: String,
    pub description: String,
    pub time_minutes: u32,
    pub difficulty: Option<Difficulty>,
    pub cost: DisplayCost,
    pub tools: Vec<Tool>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Unión etiquetada de las formas de entrada.
#[derive(Debug, Clone, Copy)]
pub enum RawProcedure<'a> {
    Local {
        procedure: &'a Procedure,
        make_name: Option<&'a str>,
        model_name: Option<&'a str>,
    },
    /// Fila de `procedures`, opcionalmente con `model:{name, make:{name}}`
    /// embebido o columnas `make_name`/`model_name`.
    Remote(&'a Value),
}

pub fn compose(raw: RawProcedure<'_>) -> DisplayProcedure {
    match raw {
        RawProcedure::Local { procedure, make_name, model_name } => from_local(procedure, make_name, model_name),
        RawProcedure::Remote(row) => from_row(row),
    }
}

fn from_local(p: &Procedure, make_name: Option<&str>, model_name: Option<&str>) -> DisplayProcedure {
    DisplayProcedure { id: p.id.clone(),
                       category: Some(p.category),
                       title: p.title.clone(),
                       description: p.description.clone(),
                       time_minutes: p.time_minutes,
                       difficulty: Some(p.difficulty),
                       cost: DisplayCost { min: p.cost.min(), max: p.cost.max() },
                       tools: p.tools.clone(),
                       steps: p.steps.clone(),
                       notes: p.notes().to_vec(),
                       chip_type: p.chip_type.clone(),
                       pin_code: p.pin_code.clone(),
                       make_name: make_name.map(str::to_string),
                       model_name: model_name.map(str::to_string) }
}

fn from_row(row: &Value) -> DisplayProcedure {
    let model = row.get("model");
    let make = model.and_then(|m| m.get("make"));
    let make_name = opt_text(row.get("make_name")).or_else(|| opt_text(make.and_then(|m| m.get("name"))));
    let model_name = opt_text(row.get("model_name")).or_else(|| opt_text(model.and_then(|m| m.get("name"))));
    DisplayProcedure { id: text_or_empty(row.get("id")),
                       category: row.get("category").and_then(Value::as_str).and_then(|s| s.parse().ok()),
                       title: text_or_empty(row.get("title")),
                       description: text_or_empty(row.get("description")),
                       time_minutes: number_or_zero(row.get("time_minutes")),
                       difficulty: match row.get("difficulty") {
                           // columna omitida: default del esquema
                           None | Some(Value::Null) => Some(Difficulty::Medium),
                           Some(v) => v.as_str().and_then(|s| s.parse().ok()),
                       },
                       cost: cost_from_row(row),
                       tools: normalize_tools(row.get("tools")),
                       steps: normalize_steps(row.get("steps")),
                       notes: normalize_notes(row.get("notes")),
                       chip_type: opt_text(row.get("chip_type")),
                       pin_code: opt_text(row.get("pin_code")),
                       make_name,
                       model_name }
}

/// Paso: texto tal cual; objeto → `title` (preferido) o `description`;
/// cualquier otra cosa → texto vacío.
pub fn normalize_step(step: &Value) -> String {
    match step {
        Value::String(s) => s.clone(),
        Value::Object(obj) => non_empty_str(obj.get("title")).or_else(|| non_empty_str(obj.get("description")))
                                                             .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Nota: texto tal cual; objeto → `content`; cualquier otra cosa → vacío.
pub fn normalize_note(note: &Value) -> String {
    match note {
        Value::String(s) => s.clone(),
        Value::Object(obj) => non_empty_str(obj.get("content")).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Lista de pasos; valores no-array producen lista vacía.
pub fn normalize_steps(steps: Option<&Value>) -> Vec<String> {
    match steps {
        Some(Value::Array(items)) => items.iter().map(normalize_step).collect(),
        _ => Vec::new(),
    }
}

pub fn normalize_notes(notes: Option<&Value>) -> Vec<String> {
    match notes {
        Some(Value::Array(items)) => items.iter().map(normalize_note).collect(),
        _ => Vec::new(),
    }
}

/// Herramientas: objetos `{name, required}` o texto plano (requerida).
pub fn normalize_tools(tools: Option<&Value>) -> Vec<Tool> {
    let items = match tools {
        Some(Value::Array(items)) => items,
        _ => return Vec::new(),
    };
    items.iter()
         .map(|t| match t {
             Value::String(name) => Tool { name: name.clone(), required: true },
             Value::Object(obj) => Tool { name: non_empty_str(obj.get("name")).unwrap_or_default(),
                                          required: obj.get("required").and_then(Value::as_bool).unwrap_or(true) },
             _ => Tool { name: String::new(), required: true },
         })
         .collect()
}

fn cost_from_row(row: &Value) -> DisplayCost {
    let min = row.get("cost_min").and_then(as_bound);
    let max = row.get("cost_max").and_then(as_bound);
    let (min, max) = match (min, max) {
        (None, None) => (0, 0),
        (Some(v), None) | (None, Some(v)) => (v, v),
        (Some(a), Some(b)) => (a, b),
    };
    // rango invertido: se colapsa en la cota inferior
    DisplayCost { min, max: max.max(min) }
}

fn as_bound(v: &Value) -> Option<u32> {
    let n = v.as_f64()?;
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, u32::MAX as f64) as u32)
}

fn number_or_zero(v: Option<&Value>) -> u32 {
    v.and_then(as_bound).unwrap_or(0)
}

fn text_or_empty(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn opt_text(v: Option<&Value>) -> Option<String> {
    non_empty_str(v)
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// `< 60` → `"45 min"`; si no, `"2h"` o `"1h 30m"`.
pub fn format_time(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let (h, m) = (minutes / 60, minutes % 60);
    if m > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{h}h")
    }
}

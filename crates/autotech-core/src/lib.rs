//! autotech-core: lógica reutilizable del catálogo de procedimientos.
//!
//! - `search`: filtrado por categoría y texto libre (funciones puras).
//! - `display`: normalización de procedimientos heterogéneos a `DisplayProcedure`.
//! - `local`: catálogo editable persistido en un almacén clave-valor (modo demo).
//! - `remote`: contrato genérico con el almacén relacional + backend en memoria.
//! - `repo`: interfaz `CatalogRepository` con implementaciones local y remota.
//! - `admin`, `feedback`, `auth`, `detail`: flujos sobre el cliente remoto.
pub mod admin;
pub mod auth;
pub mod detail;
pub mod display;
pub mod errors;
pub mod feedback;
pub mod local;
pub mod remote;
pub mod repo;
pub mod search;

pub use admin::AdminService;
pub use auth::{AdminGate, AuthProvider, CurrentUser, GateMode, InMemoryAuthProvider};
pub use detail::{DetailLoader, DetailSelection, LinkedSummary, ProcedureDetail};
pub use display::{compose, format_time, DisplayProcedure, RawProcedure};
pub use errors::CoreError;
pub use feedback::{FeedbackService, ModerationService};
pub use local::{seed_catalog, InMemoryKeyValueStore, KeyValueStore, LocalCatalogStore, ModelInfo};
pub use remote::{Filter, InMemoryDataClient, Query, RemoteDataClient, Row, Table};
pub use repo::{CatalogRepository, LocalCatalogRepository, MakeNode, MakeSummary, ModelKey, ModelNode, ModelSummary,
               ProcedureScope, RemoteCatalogRepository};
pub use search::{category_counts, filter_procedures, scoped_procedures, CategoryFilter, VehicleSelection};

// autotech-domain library entry point
pub mod category;
pub mod error;
pub mod feedback;
pub mod password;
pub mod procedure;
pub mod records;
pub mod variant;
pub mod vehicle;
pub use category::{Difficulty, ServiceCategory};
pub use error::DomainError;
pub use feedback::{Feedback, FeedbackDraft, FeedbackStatus, FeedbackType};
pub use procedure::{CostRange, Procedure, ProcedureDraft, Tool};
pub use variant::{LinkedProcedure, Relationship, ToolGuide, Variant};
pub use vehicle::{Make, Model, VehicleMake, VehicleModel};

// Core moderation module - the account gate business logic.

pub mod gate_models;
pub mod gate_service;

pub use gate_models::*;
pub use gate_service::*;

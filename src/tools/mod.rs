//! CRM tool registry
//!
//! The catalog is a closed set of tool kinds; the executor binds each kind to
//! the [`crate::db::CrmStore`] and renders results as speakable text.

mod catalog;
pub mod executor;

pub use catalog::{CrmTool, catalog};
pub use executor::ToolExecutor;

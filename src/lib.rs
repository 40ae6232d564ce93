//! Subfilter engine for monitoring views.
//!
//! Given a base result set of records, the engine counts every facet
//! dimension's values against the user's current selection and renders a
//! "refine your results" panel where each value is selected, available
//! (with an incremental count) or unavailable.

pub mod app;
pub mod audit;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod source;
pub mod store;
pub mod view;
pub mod web;

pub use engine::{EngineSettings, SubfilterEngine, SubfilterView};
pub use error::{Result, SubfilterError};
pub use model::{Record, Severity, Tag};
pub use view::{RenderContext, UserKind, ViewKind};

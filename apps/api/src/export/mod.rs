//! Document export: live resume preview → print-ready HTML → render service.

pub mod assembler;
pub mod chrome;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod live;
pub mod models;
pub mod normalize;
pub mod overrides;
pub mod pagination;
pub mod pipeline;
pub mod style_capture;
pub mod templates;

pub use error::ExportError;
pub use gate::ExportGate;

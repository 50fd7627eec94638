//! Release-notes templating: typed blocks rendered against build metadata.
//!
//! Rendering is pure. Every validation failure is a [`TemplateError`]; no
//! partial output is ever returned.

mod block;
mod error;
mod metadata;
mod output;
mod render;
pub mod store;

pub use block::{
    create_default_template, DepotListConfig, FreeTextConfig, TemplateBlock, TemplatePayload,
    TextConfig, TEMPLATE_VERSION,
};
pub use error::TemplateError;
pub use metadata::{format_build_datetime, TemplateDepot, TemplateMetadata};
pub use output::{release_notes_path, write_release_notes};
pub use render::{
    render_template, TemplateRenderer, DEPOT_FIELDS, MAX_DEPOTS, MAX_OUTPUT_CHARS, SINGLE_FIELDS,
};

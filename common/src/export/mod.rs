//! Export core utilities shared by CLI/tests.

pub mod template_core;

pub use template_core::{generate_template_buffer, TemplateRow, TEMPLATE_HEADERS, TEMPLATE_NOTES, TEMPLATE_ROWS};

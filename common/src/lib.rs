//! PDF Index Common Library
//!
//! バッチ処理（CLI）とテストで共有される型とユーティリティ

pub mod types;
pub mod layout;
pub mod naming;
pub mod error;
#[cfg(feature = "excel")]
pub mod export;

pub use types::{IndexEntry, ResolvedJob, RowRejection, ProcessingOutcome, OutcomeStatus, RunReport, RunEvent};
pub use layout::{PageSize, LabelPlacement};
pub use naming::{sanitize_index, output_file_name, resolve_source_path};
pub use error::{Error, Result};

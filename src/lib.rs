pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod stamper;
pub mod table;
pub mod template;

pub use error::{PdfIndexError, Result};
pub use runner::{BatchRunner, BatchSession, CancelToken, ERROR_LOG_NAME};
pub use stamper::{PdfStamper, Stamp};

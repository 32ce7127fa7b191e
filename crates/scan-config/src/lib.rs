//! Scan request configuration: defaults, assembly and validation.

pub mod assembler;
pub mod defaults;
pub mod error;
pub mod rules;

pub use assembler::{ConfigAssembler, RawParams, ScanRequestConfig};
pub use defaults::{ScanCatalog, ScanDefaults};
pub use error::ValidationError;

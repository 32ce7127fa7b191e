//! Common utilities and types shared across scangate crates.

pub mod error;
pub mod hash;
pub mod i18n;
pub mod naming;
pub mod target;
pub mod timestamp;

pub use error::{Error, Result};
pub use i18n::{Language, MessageKey};
pub use target::TargetType;
pub use timestamp::Timestamp;

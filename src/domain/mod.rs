//! Domain layer: content values, their classification and the target document.

pub mod document;
pub mod error;
pub mod value;

//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod sources;
pub mod surface;
pub mod telemetry;
pub mod transpiler;

//! Assemble content from independent sources into one preview document and
//! publish it to an isolated rendering surface.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

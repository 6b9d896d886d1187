pub(crate) mod lock;
pub mod text;

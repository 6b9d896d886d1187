use thiserror::Error;

use super::value::ContentKind;

/// Contract violations detected while a source or value is being assembled.
///
/// These are raised eagerly, before any publish cycle can observe the
/// offending configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("container attributes are only allowed for wrapped kinds, `{kind}` is injected raw")]
    AttributesOnRawKind { kind: ContentKind },
    #[error("source `{name}` does not declare a language")]
    MissingLanguage { name: String },
    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
    #[error("unknown document region `{0}`")]
    UnknownRegion(String),
    #[error("source `{name}` is written in TypeScript but no transpiler is configured")]
    MissingTranspiler { name: String },
    #[error("source `{name}` must set exactly one of `path` or `content`")]
    AmbiguousSource { name: String },
}

impl ConfigurationError {
    pub fn attributes_on_raw_kind(kind: ContentKind) -> Self {
        Self::AttributesOnRawKind { kind }
    }

    pub fn missing_language(name: impl Into<String>) -> Self {
        Self::MissingLanguage { name: name.into() }
    }

    pub fn missing_transpiler(name: impl Into<String>) -> Self {
        Self::MissingTranspiler { name: name.into() }
    }

    pub fn ambiguous_source(name: impl Into<String>) -> Self {
        Self::AmbiguousSource { name: name.into() }
    }
}

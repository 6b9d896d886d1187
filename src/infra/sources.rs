//! Editor-like content sources backed by inline text or files.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    application::{ContentProductionError, Contributor},
    domain::{
        error::ConfigurationError,
        value::{ContainerAttributes, ContentValue, Language, Region},
    },
    util::text::trim_default_value,
};

use super::transpiler::Transpiler;

const TARGET: &str = "infra::sources";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceText {
    Inline(String),
    /// Re-read on every cycle so edits show up on the next update.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub language: Option<Language>,
    pub region: Region,
    pub priority: i32,
    pub attributes: Option<ContainerAttributes>,
    pub trim_default_value: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            language: None,
            region: Region::Body,
            priority: 0,
            attributes: None,
            trim_default_value: true,
        }
    }
}

impl SourceOptions {
    pub fn language(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }
}

pub struct SourceContributor {
    name: String,
    language: Language,
    source: SourceText,
    region: Region,
    priority: i32,
    attributes: Option<ContainerAttributes>,
    trim: bool,
    transpiler: Option<Arc<dyn Transpiler>>,
}

impl std::fmt::Debug for SourceContributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContributor")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("source", &self.source)
            .field("region", &self.region)
            .field("priority", &self.priority)
            .field("transpiler", &self.transpiler.is_some())
            .finish()
    }
}

impl SourceContributor {
    /// Validate the options up front so a misconfigured source never reaches
    /// a publish cycle.
    pub fn new(
        name: impl Into<String>,
        source: SourceText,
        options: SourceOptions,
        transpiler: Option<Arc<dyn Transpiler>>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let language = options
            .language
            .ok_or_else(|| ConfigurationError::missing_language(&name))?;

        if options.attributes.is_some() && !language.kind().requires_container() {
            return Err(ConfigurationError::attributes_on_raw_kind(language.kind()));
        }
        if language.requires_transform() && transpiler.is_none() {
            return Err(ConfigurationError::missing_transpiler(&name));
        }

        let source = match source {
            SourceText::Inline(text) if options.trim_default_value => {
                SourceText::Inline(trim_default_value(&text))
            }
            other => other,
        };

        Ok(Self {
            name,
            language,
            source,
            region: options.region,
            priority: options.priority,
            attributes: options.attributes,
            trim: options.trim_default_value,
            transpiler,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> Language {
        self.language
    }

    async fn read(&self) -> Result<String, ContentProductionError> {
        match &self.source {
            SourceText::Inline(text) => Ok(text.clone()),
            SourceText::File(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|err| {
                    ContentProductionError::Read {
                        name: self.name.clone(),
                        error: err,
                    }
                })?;
                Ok(if self.trim {
                    trim_default_value(&text)
                } else {
                    text
                })
            }
        }
    }
}

#[async_trait]
impl Contributor for SourceContributor {
    async fn produce_value(&self) -> Result<ContentValue, ContentProductionError> {
        let mut content = self.read().await?;

        if self.language.requires_transform() {
            let transpiler = self
                .transpiler
                .as_ref()
                .ok_or_else(|| ConfigurationError::missing_transpiler(&self.name))?;
            content = transpiler.transpile(&self.name, &content).await?;
        }

        debug!(
            target = TARGET,
            source_name = %self.name,
            language = %self.language,
            bytes = content.len(),
            "Source produced value"
        );

        let value = ContentValue::new(self.language.kind(), content)
            .in_region(self.region)
            .with_priority(self.priority);
        match &self.attributes {
            Some(attributes) => Ok(value.with_attributes(attributes.clone())?),
            None => Ok(value),
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn label(&self) -> &str {
        &self.name
    }
}

//! Content values and the classification table that decides where and how
//! each kind of content lands in the assembled document.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Section of the target document a value is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Head,
    Body,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Head => "head",
            Region::Body => "body",
        }
    }
}

impl TryFrom<&str> for Region {
    type Error = ConfigurationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "head" => Ok(Region::Head),
            "body" => Ok(Region::Body),
            other => Err(ConfigurationError::UnknownRegion(other.to_string())),
        }
    }
}

/// Closed set of content kinds understood by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Markup,
    Stylesheet,
    Script,
}

impl ContentKind {
    /// Total mapping from kind to placement rules.
    pub fn classify(self) -> Classification {
        match self {
            ContentKind::Markup => Classification {
                region_default: Region::Body,
                tag: None,
            },
            ContentKind::Stylesheet => Classification {
                region_default: Region::Head,
                tag: Some(ContainerTag::Style),
            },
            ContentKind::Script => Classification {
                region_default: Region::Body,
                tag: Some(ContainerTag::Script),
            },
        }
    }

    pub fn requires_container(self) -> bool {
        self.classify().tag.is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Markup => "markup",
            ContentKind::Stylesheet => "stylesheet",
            ContentKind::Script => "script",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated element wrapped around container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerTag {
    Style,
    Script,
}

impl ContainerTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerTag::Style => "style",
            ContainerTag::Script => "script",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub region_default: Region,
    pub tag: Option<ContainerTag>,
}

/// Source languages accepted from editors and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn kind(self) -> ContentKind {
        match self {
            Language::Html => ContentKind::Markup,
            Language::Css => ContentKind::Stylesheet,
            Language::JavaScript | Language::TypeScript => ContentKind::Script,
        }
    }

    /// TypeScript must be compiled to JavaScript before it can be embedded.
    pub fn requires_transform(self) -> bool {
        matches!(self, Language::TypeScript)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Css => "css",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }
}

impl TryFrom<&str> for Language {
    type Error = ConfigurationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "html" => Ok(Language::Html),
            "css" => Ok(Language::Css),
            "javascript" => Ok(Language::JavaScript),
            "typescript" => Ok(Language::TypeScript),
            other => Err(ConfigurationError::UnknownLanguage(other.to_string())),
        }
    }
}

impl FromStr for Language {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Language::try_from(value)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a generated container element, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerAttributes(IndexMap<String, String>);

impl ContainerAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ContainerAttributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// One contributor's output for a single publish cycle.
///
/// Values are immutable after construction. Container attributes can only be
/// attached to wrapped kinds; doing so for markup fails immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentValue {
    kind: ContentKind,
    content: String,
    region: Region,
    priority: i32,
    attributes: ContainerAttributes,
}

impl ContentValue {
    pub fn new(kind: ContentKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            region: kind.classify().region_default,
            priority: 0,
            attributes: ContainerAttributes::default(),
        }
    }

    pub fn markup(content: impl Into<String>) -> Self {
        Self::new(ContentKind::Markup, content)
    }

    pub fn stylesheet(content: impl Into<String>) -> Self {
        Self::new(ContentKind::Stylesheet, content)
    }

    pub fn script(content: impl Into<String>) -> Self {
        Self::new(ContentKind::Script, content)
    }

    pub fn in_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach container attributes. Any attribute map, even an empty one, is
    /// rejected for raw kinds.
    pub fn with_attributes(
        mut self,
        attributes: ContainerAttributes,
    ) -> Result<Self, ConfigurationError> {
        if !self.kind.requires_container() {
            return Err(ConfigurationError::attributes_on_raw_kind(self.kind));
        }
        self.attributes = attributes;
        Ok(self)
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn attributes(&self) -> &ContainerAttributes {
        &self.attributes
    }

    pub fn tag(&self) -> Option<ContainerTag> {
        self.kind.classify().tag
    }
}

//! Module-call template rendering
//!
//! Templates use `{{key}}` placeholders (delimiters are configurable). A
//! placeholder is a key lookup and nothing else: keys are limited to
//! `[A-Za-z0-9_.-]` with an optional leading `.`, and any other expression
//! is rejected. Keys absent from the parameter map render as the empty
//! string and are reported in [`Rendered::defaulted`].

use crate::context::TemplateSource;
use crate::params::ParameterMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Template loading and rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Opening delimiter without a matching close.
    #[error("unclosed placeholder at byte {offset}")]
    Unclosed {
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// Placeholder body is not a plain key.
    #[error("unsupported template expression '{expression}' at byte {offset}")]
    UnsupportedExpression {
        /// Trimmed placeholder body
        expression: String,
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// Template name would leave the template directory.
    #[error("invalid template name '{0}'")]
    InvalidName(String),

    /// Template file does not exist.
    #[error("template '{name}' not found in {}", .dir.display())]
    NotFound {
        /// Requested name
        name: String,
        /// Directory searched
        dir: PathBuf,
    },

    /// Reading the template failed.
    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        /// Template path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Output of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered text
    pub text: String,
    /// Keys that were missing and rendered empty, in order of first use
    pub defaulted: Vec<String>,
}

/// Placeholder renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    open: String,
    close: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

impl Renderer {
    /// Renderer with custom delimiters. Empty delimiters fall back to the defaults.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        let open = open.into();
        let close = close.into();
        Self {
            open: if open.is_empty() { "{{".to_string() } else { open },
            close: if close.is_empty() { "}}".to_string() } else { close },
        }
    }

    /// Render `template` against `params`.
    pub fn render(&self, template: &str, params: &ParameterMap) -> Result<Rendered, TemplateError> {
        let mut text = String::with_capacity(template.len());
        let mut defaulted: Vec<String> = Vec::new();
        let mut rest = template;
        let mut consumed = 0;

        while let Some(start) = rest.find(&self.open) {
            let offset = consumed + start;
            text.push_str(&rest[..start]);

            let body_start = start + self.open.len();
            let end = rest[body_start..]
                .find(&self.close)
                .ok_or(TemplateError::Unclosed { offset })?;

            let expression = rest[body_start..body_start + end].trim();
            let key = parse_key(expression).ok_or_else(|| TemplateError::UnsupportedExpression {
                expression: expression.to_string(),
                offset,
            })?;

            match params.get(key) {
                Some(value) => text.push_str(value),
                None => {
                    if !defaulted.iter().any(|k| k == key) {
                        defaulted.push(key.to_string());
                    }
                }
            }

            let advance = body_start + end + self.close.len();
            consumed += advance;
            rest = &rest[advance..];
        }
        text.push_str(rest);

        Ok(Rendered { text, defaulted })
    }
}

/// Extract the lookup key from a placeholder body.
fn parse_key(expression: &str) -> Option<&str> {
    let key = expression.strip_prefix('.').unwrap_or(expression);
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    valid.then_some(key)
}

/// Templates stored as files under one directory.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    root: PathBuf,
}

impl TemplateDir {
    /// Templates under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Template directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a template name to a path inside the directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(name);
        let safe = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(TemplateError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateSource for TemplateDir {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(TemplateError::NotFound {
                name: name.to_string(),
                dir: self.root.clone(),
            }),
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }
}

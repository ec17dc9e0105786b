//! Request-body templates.
//!
//! Templates are JSON documents. A string value of the exact form
//! `"{{Field}}"` is a placeholder, replaced by the `Field` member of the data
//! object passed to [`TemplateRenderer::render`]. A `null` value removes the
//! enclosing object member or array element, and any object or array emptied
//! that way is removed as well; optional request fields are expressed like
//! this.
//!
//! Templates are parsed up front, so a missing or malformed template is
//! reported when the client is built rather than in the middle of a
//! provisioning run.

use std::collections::HashMap;
use std::fmt;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde_json::{Map, Value};
use thiserror::Error;

/// Names a request-body template.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TemplateId {
    /// Body of `SoftLayer_Virtual_Guest/createObject`.
    CreateInstance,
    /// Body of `SoftLayer_Security_Ssh_Key/createObject`.
    CreateSshKey,
    /// Body of `SoftLayer_Virtual_Guest/{id}/captureImage`.
    CaptureImage,
}

impl TemplateId {
    /// Every template the client renders.
    pub const ALL: [Self; 3] = [Self::CreateInstance, Self::CreateSshKey, Self::CaptureImage];

    /// Path of the template relative to the template directory.
    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::CreateInstance => "virtual_guest/createObject.json",
            Self::CreateSshKey => "security_ssh_key/createObject.json",
            Self::CaptureImage => "virtual_guest/captureImage.json",
        }
    }

    const fn builtin_source(self) -> &'static str {
        match self {
            Self::CreateInstance => include_str!("../templates/virtual_guest/createObject.json"),
            Self::CreateSshKey => include_str!("../templates/security_ssh_key/createObject.json"),
            Self::CaptureImage => include_str!("../templates/virtual_guest/captureImage.json"),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.relative_path())
    }
}

/// Errors raised while loading or rendering templates.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template `{path}`: {message}")]
    Missing {
        /// Path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// The template is not valid JSON.
    #[error("failed to parse template `{path}`: {message}")]
    Parse {
        /// Template path.
        path: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The renderer has no template registered under this identifier.
    #[error("no template registered for `{0}`")]
    Unregistered(TemplateId),
    /// The data could not be converted to JSON.
    #[error("template data for `{template}` is not serialisable: {message}")]
    Serialize {
        /// Template being rendered.
        template: TemplateId,
        /// Serializer diagnostic.
        message: String,
    },
    /// The data object is not a JSON object.
    #[error("template data for `{template}` must be a JSON object")]
    InvalidData {
        /// Template being rendered.
        template: TemplateId,
    },
    /// A placeholder names a field absent from the data object.
    #[error("template `{template}` references unknown field `{field}`")]
    UnknownField {
        /// Template being rendered.
        template: TemplateId,
        /// Placeholder field name.
        field: String,
    },
}

/// Renders a named template against a data object into a request body.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the template is unknown or references a
    /// field the data does not provide.
    fn render(&self, template: TemplateId, data: &Value) -> Result<Vec<u8>, TemplateError>;
}

/// Parsed templates keyed by [`TemplateId`].
#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    templates: HashMap<TemplateId, Value>,
}

impl TemplateSet {
    /// Parses the templates compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] if an embedded template is malformed.
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut set = Self::default();
        for id in TemplateId::ALL {
            set.insert(id, id.builtin_source())?;
        }
        Ok(set)
    }

    /// Reads every template from `dir`, using [`TemplateId::relative_path`]
    /// for file names.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Missing`] when the directory or a template
    /// cannot be read and [`TemplateError::Parse`] when a file is not JSON.
    pub fn load_dir(dir: &Utf8Path) -> Result<Self, TemplateError> {
        let root =
            Dir::open_ambient_dir(dir, ambient_authority()).map_err(|err| TemplateError::Missing {
                path: dir.to_string(),
                message: err.to_string(),
            })?;

        let mut set = Self::default();
        for id in TemplateId::ALL {
            let source =
                root.read_to_string(id.relative_path())
                    .map_err(|err| TemplateError::Missing {
                        path: dir.join(id.relative_path()).to_string(),
                        message: err.to_string(),
                    })?;
            set.insert(id, &source)?;
        }
        Ok(set)
    }

    /// Loads templates from `dir` when given, otherwise the built-in set.
    ///
    /// # Errors
    ///
    /// See [`TemplateSet::load_dir`] and [`TemplateSet::builtin`].
    pub fn from_optional_dir(dir: Option<&Utf8Path>) -> Result<Self, TemplateError> {
        dir.map_or_else(Self::builtin, Self::load_dir)
    }

    /// Registers `source` under `id`, replacing any previous template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] when `source` is not JSON.
    pub fn insert(&mut self, id: TemplateId, source: &str) -> Result<(), TemplateError> {
        let parsed = serde_json::from_str(source).map_err(|err| TemplateError::Parse {
            path: id.relative_path().to_owned(),
            message: err.to_string(),
        })?;
        self.templates.insert(id, parsed);
        Ok(())
    }
}

impl TemplateRenderer for TemplateSet {
    fn render(&self, template: TemplateId, data: &Value) -> Result<Vec<u8>, TemplateError> {
        let source = self
            .templates
            .get(&template)
            .ok_or(TemplateError::Unregistered(template))?;
        let Value::Object(fields) = data else {
            return Err(TemplateError::InvalidData { template });
        };
        let rendered = substitute(source, fields, template)?.unwrap_or(Value::Null);
        Ok(rendered.to_string().into_bytes())
    }
}

fn placeholder(value: &str) -> Option<&str> {
    value
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
}

/// Returns `None` when the node should be dropped from its parent.
fn substitute(
    node: &Value,
    fields: &Map<String, Value>,
    template: TemplateId,
) -> Result<Option<Value>, TemplateError> {
    match node {
        Value::String(text) => {
            let Some(name) = placeholder(text) else {
                return Ok(Some(node.clone()));
            };
            let value = fields
                .get(name)
                .ok_or_else(|| TemplateError::UnknownField {
                    template,
                    field: name.to_owned(),
                })?;
            Ok((!value.is_null()).then(|| value.clone()))
        }
        Value::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = substitute(item, fields, template)? {
                    rendered.push(value);
                }
            }
            let emptied = rendered.is_empty() && !items.is_empty();
            Ok((!emptied).then_some(Value::Array(rendered)))
        }
        Value::Object(members) => {
            let mut rendered = Map::new();
            for (key, member) in members {
                if let Some(value) = substitute(member, fields, template)? {
                    rendered.insert(key.clone(), value);
                }
            }
            let emptied = rendered.is_empty() && !members.is_empty();
            Ok((!emptied).then_some(Value::Object(rendered)))
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(Some(node.clone())),
    }
}

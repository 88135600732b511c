//! # Template Resolver
//!
//! Picks the template text used for each generation role.
//!
//! For every role the first available source wins:
//!
//! 1. the operator's override file for that exact role,
//! 2. the role's file inside the configured template directory,
//! 3. the default bundled with the binary.
//!
//! Overrides never leak into other roles, and a requested file that cannot be read is an
//! error rather than a silent fallback to the default.
use crate::config::TemplateConfig;
use crate::descriptor::StreamingDirection;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read the {role} template from '{}'", path.display())]
    Read {
        role: TemplateRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse the {role} template ({origin})")]
    Parse {
        role: TemplateRole,
        origin: TemplateOrigin,
        #[source]
        source: tera::Error,
    },
}

/// A generation role. Each role has its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateRole {
    UnaryMethod,
    ServerStreamMethod,
    ClientStreamMethod,
    BidiStreamMethod,
    Service,
}

impl TemplateRole {
    pub const ALL: [TemplateRole; 5] = [
        TemplateRole::UnaryMethod,
        TemplateRole::ServerStreamMethod,
        TemplateRole::ClientStreamMethod,
        TemplateRole::BidiStreamMethod,
        TemplateRole::Service,
    ];

    /// The method role for a streaming direction.
    pub fn for_direction(direction: StreamingDirection) -> Self {
        match direction {
            StreamingDirection::Unary => TemplateRole::UnaryMethod,
            StreamingDirection::ServerStreaming => TemplateRole::ServerStreamMethod,
            StreamingDirection::ClientStreaming => TemplateRole::ClientStreamMethod,
            StreamingDirection::BidiStreaming => TemplateRole::BidiStreamMethod,
        }
    }

    /// File name of the role's template, both bundled and inside a template directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateRole::UnaryMethod => "method.unary.rs.tera",
            TemplateRole::ServerStreamMethod => "method.server.stream.rs.tera",
            TemplateRole::ClientStreamMethod => "method.client.stream.rs.tera",
            TemplateRole::BidiStreamMethod => "method.bidi.stream.rs.tera",
            TemplateRole::Service => "service.rs.tera",
        }
    }

    /// Name of the plugin parameter that overrides this role.
    pub fn option_name(&self) -> &'static str {
        match self {
            TemplateRole::UnaryMethod => "unaryMethodTemplate",
            TemplateRole::ServerStreamMethod => "serverStreamMethodTemplate",
            TemplateRole::ClientStreamMethod => "clientStreamMethodTemplate",
            TemplateRole::BidiStreamMethod => "bidiStreamMethodTemplate",
            TemplateRole::Service => "serviceTemplate",
        }
    }

    fn bundled(&self) -> &'static str {
        match self {
            TemplateRole::UnaryMethod => include_str!("../templates/method.unary.rs.tera"),
            TemplateRole::ServerStreamMethod => {
                include_str!("../templates/method.server.stream.rs.tera")
            }
            TemplateRole::ClientStreamMethod => {
                include_str!("../templates/method.client.stream.rs.tera")
            }
            TemplateRole::BidiStreamMethod => {
                include_str!("../templates/method.bidi.stream.rs.tera")
            }
            TemplateRole::Service => include_str!("../templates/service.rs.tera"),
        }
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateRole::UnaryMethod => "unary method",
            TemplateRole::ServerStreamMethod => "server streaming method",
            TemplateRole::ClientStreamMethod => "client streaming method",
            TemplateRole::BidiStreamMethod => "bidirectional streaming method",
            TemplateRole::Service => "service",
        };
        f.write_str(name)
    }
}

/// Where a template's text was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Bundled,
    Directory(PathBuf),
    Override(PathBuf),
}

impl fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateOrigin::Bundled => f.write_str("bundled default"),
            TemplateOrigin::Directory(path) => write!(f, "template directory '{}'", path.display()),
            TemplateOrigin::Override(path) => write!(f, "override '{}'", path.display()),
        }
    }
}

/// The text of a template together with its role and origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub role: TemplateRole,
    pub origin: TemplateOrigin,
    pub text: String,
}

/// Resolves the template used for methods with the given streaming direction.
pub fn resolve_method_template(
    direction: StreamingDirection,
    config: &TemplateConfig,
) -> Result<TemplateSource, TemplateError> {
    resolve(TemplateRole::for_direction(direction), config)
}

/// Resolves the template used for services.
pub fn resolve_service_template(config: &TemplateConfig) -> Result<TemplateSource, TemplateError> {
    resolve(TemplateRole::Service, config)
}

/// Resolves the template of every role.
pub fn resolve_all(config: &TemplateConfig) -> Result<Vec<TemplateSource>, TemplateError> {
    TemplateRole::ALL
        .into_iter()
        .map(|role| resolve(role, config))
        .collect()
}

fn resolve(role: TemplateRole, config: &TemplateConfig) -> Result<TemplateSource, TemplateError> {
    if let Some(path) = config.overrides.get(role) {
        return read(role, path, TemplateOrigin::Override(path.to_path_buf()));
    }

    if let Some(directory) = &config.directory {
        let path = directory.join(role.file_name());
        return read(role, &path, TemplateOrigin::Directory(path.clone()));
    }

    Ok(TemplateSource {
        role,
        origin: TemplateOrigin::Bundled,
        text: role.bundled().to_string(),
    })
}

fn read(role: TemplateRole, path: &Path, origin: TemplateOrigin) -> Result<TemplateSource, TemplateError> {
    let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        role,
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(%role, %origin, "loaded template");

    Ok(TemplateSource { role, origin, text })
}

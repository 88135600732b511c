//! # Generator Configuration
//!
//! The plugin parameters, captured once when the request arrives and then passed by
//! reference into the [`Generator`](crate::generator::Generator). Nothing deeper in the
//! pipeline reads process-wide state.
use crate::emit::OutputLayout;
use crate::resolver::ModulePath;
use crate::template::TemplateRole;
use std::path::{Path, PathBuf};

pub const DEFAULT_TYPES_ROOT: &str = "crate::pb";
pub const DEFAULT_SCAFFOLD_MODULE: &str = "crate::service";
pub const DEFAULT_ALTERNATE_TRANSPORT_SUFFIX: &str = "_connect";

/// Operator supplied template files, one optional path per role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOverrides {
    pub unary_method: Option<PathBuf>,
    pub server_stream_method: Option<PathBuf>,
    pub client_stream_method: Option<PathBuf>,
    pub bidi_stream_method: Option<PathBuf>,
    pub service: Option<PathBuf>,
}

impl TemplateOverrides {
    /// The override for `role`. Empty paths count as unset.
    pub fn get(&self, role: TemplateRole) -> Option<&Path> {
        let path = match role {
            TemplateRole::UnaryMethod => &self.unary_method,
            TemplateRole::ServerStreamMethod => &self.server_stream_method,
            TemplateRole::ClientStreamMethod => &self.client_stream_method,
            TemplateRole::BidiStreamMethod => &self.bidi_stream_method,
            TemplateRole::Service => &self.service,
        };

        path.as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Where templates come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateConfig {
    pub overrides: TemplateOverrides,
    /// Replaces the bundled defaults with the files found in this directory.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub templates: TemplateConfig,
    pub layout: OutputLayout,
    /// Module under which the `prost` generated packages live.
    pub types_root: ModulePath,
    /// Module the generated scaffolding is placed in.
    pub scaffold_module: ModulePath,
    pub alternate_transport_suffix: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            templates: TemplateConfig::default(),
            layout: OutputLayout::default(),
            types_root: ModulePath::parse(DEFAULT_TYPES_ROOT),
            scaffold_module: ModulePath::parse(DEFAULT_SCAFFOLD_MODULE),
            alternate_transport_suffix: DEFAULT_ALTERNATE_TRANSPORT_SUFFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_are_scoped_per_role() {
        let overrides = TemplateOverrides {
            unary_method: Some(PathBuf::from("unary.tera")),
            ..Default::default()
        };

        assert_eq!(
            overrides.get(TemplateRole::UnaryMethod),
            Some(Path::new("unary.tera"))
        );
        assert_eq!(overrides.get(TemplateRole::ServerStreamMethod), None);
        assert_eq!(overrides.get(TemplateRole::Service), None);
    }

    #[test]
    fn test_empty_override_counts_as_unset() {
        let overrides = TemplateOverrides {
            service: Some(PathBuf::new()),
            ..Default::default()
        };

        assert_eq!(overrides.get(TemplateRole::Service), None);
    }
}

//! # Emitter
//!
//! Assigns every rendered record its output path and assembles the raw artifact:
//! a module header line, the `use` declarations recorded while resolving identifiers,
//! and the rendered body.
//!
//! Paths are claimed once per run. A second artifact landing on an already claimed path
//! (e.g. `GetItem` and `getitem`) is reported with both identifiers instead of
//! overwriting the first one.
use crate::descriptor::to_module_ident;
use crate::model::{Method, Service};
use std::collections::HashMap;
use std::str::FromStr;

const EXTENSION: &str = "rs";
const NESTED_SERVICE_MODULE: &str = "service";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("'{second}' and '{first}' both generate '{path}'")]
    Collision {
        path: String,
        first: String,
        second: String,
    },
}

/// How artifacts are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// `getitem.rs`, `catalog.rs`
    #[default]
    Flat,
    /// `catalog/getitem.rs`, `catalog/service.rs`
    Nested,
}

impl OutputLayout {
    pub fn method_path(&self, service: &str, method: &str) -> String {
        match self {
            OutputLayout::Flat => format!("{}.{EXTENSION}", method.to_lowercase()),
            OutputLayout::Nested => {
                format!("{}/{}.{EXTENSION}", service.to_lowercase(), method.to_lowercase())
            }
        }
    }

    pub fn service_path(&self, service: &str) -> String {
        match self {
            OutputLayout::Flat => format!("{}.{EXTENSION}", service.to_lowercase()),
            OutputLayout::Nested => {
                format!("{}/{NESTED_SERVICE_MODULE}.{EXTENSION}", service.to_lowercase())
            }
        }
    }

    /// Module name of the service artifact as seen from its sibling method artifacts.
    pub fn service_module(&self, service: &str) -> String {
        match self {
            OutputLayout::Flat => to_module_ident(service),
            OutputLayout::Nested => NESTED_SERVICE_MODULE.to_string(),
        }
    }
}

impl FromStr for OutputLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "flat" => Ok(OutputLayout::Flat),
            "nested" => Ok(OutputLayout::Nested),
            other => Err(format!(
                "Unknown layout '{other}', expected 'flat' or 'nested'"
            )),
        }
    }
}

/// An emitted artifact before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    pub path: String,
    pub content: String,
}

/// Tracks claimed paths for the whole run.
#[derive(Debug, Default)]
pub struct Emitter {
    layout: OutputLayout,
    claimed: HashMap<String, String>,
}

impl Emitter {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            claimed: HashMap::new(),
        }
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn emit_method(
        &mut self,
        method: &Method,
        declarations: &[String],
        body: &str,
    ) -> Result<RawArtifact, EmitError> {
        let path = self.layout.method_path(&method.service_name, &method.name);
        self.emit(path, &method.full_name, declarations, body)
    }

    pub fn emit_service(
        &mut self,
        service: &Service,
        declarations: &[String],
        body: &str,
    ) -> Result<RawArtifact, EmitError> {
        let path = self.layout.service_path(&service.name);
        self.emit(path, &service.full_name, declarations, body)
    }

    fn emit(
        &mut self,
        path: String,
        identifier: &str,
        declarations: &[String],
        body: &str,
    ) -> Result<RawArtifact, EmitError> {
        if let Some(first) = self.claimed.get(&path) {
            return Err(EmitError::Collision {
                path,
                first: first.clone(),
                second: identifier.to_string(),
            });
        }
        self.claimed.insert(path.clone(), identifier.to_string());

        let mut content = module_header(&path, identifier);
        for declaration in declarations {
            content.push_str(declaration);
            content.push('\n');
        }
        content.push('\n');
        content.push_str(body);

        Ok(RawArtifact { path, content })
    }
}

fn module_header(path: &str, identifier: &str) -> String {
    let module = path
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(&format!(".{EXTENSION}")))
        .unwrap_or(path);

    format!(
        "//! Module `{}` generated from `{identifier}`.\n\n",
        to_module_ident(module)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StreamingDirection;

    fn method(name: &str) -> Method {
        Method {
            name: name.to_string(),
            full_name: format!("catalog.v1.Catalog.{name}"),
            service_name: "Catalog".to_string(),
            fn_name: String::new(),
            snake_name: String::new(),
            stream_type: String::new(),
            input_type: String::new(),
            output_type: String::new(),
            streaming: StreamingDirection::Unary,
            module_alias: "v1".to_string(),
            struct_name: "CatalogService".to_string(),
            service_module: "catalog".to_string(),
        }
    }

    #[test]
    fn test_layout_paths() {
        assert_eq!(OutputLayout::Flat.method_path("Catalog", "GetItem"), "getitem.rs");
        assert_eq!(OutputLayout::Flat.service_path("Catalog"), "catalog.rs");
        assert_eq!(OutputLayout::Flat.service_module("Catalog"), "catalog");
        assert_eq!(
            OutputLayout::Nested.method_path("Catalog", "GetItem"),
            "catalog/getitem.rs"
        );
        assert_eq!(OutputLayout::Nested.service_path("Catalog"), "catalog/service.rs");
        assert_eq!(OutputLayout::Nested.service_module("Catalog"), "service");
    }

    #[test]
    fn test_keyword_service_names_are_escaped() {
        assert_eq!(OutputLayout::Flat.service_path("Match"), "match.rs");
        assert_eq!(OutputLayout::Flat.service_module("Match"), "r#match");
        assert_eq!(OutputLayout::Flat.service_module("Self"), "self_");
        assert_eq!(OutputLayout::Nested.service_module("Type"), "service");

        let mut emitter = Emitter::new(OutputLayout::Flat);
        let service = Service {
            name: "Match".to_string(),
            full_name: "game.v1.Match".to_string(),
            trait_name: "Match".to_string(),
            struct_name: "MatchService".to_string(),
            server_module: "match_server".to_string(),
            primary_module_path: "crate::pb::game::v1".to_string(),
            alternate_transport_path: "crate::pb::game::v1::v1_connect".to_string(),
            module_alias: "v1".to_string(),
            methods: vec![],
        };

        let artifact = emitter.emit_service(&service, &[], "").unwrap();

        assert!(
            artifact
                .content
                .starts_with("//! Module `r#match` generated from `game.v1.Match`.")
        );
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("flat".parse::<OutputLayout>(), Ok(OutputLayout::Flat));
        assert_eq!("nested".parse::<OutputLayout>(), Ok(OutputLayout::Nested));
        assert!("tree".parse::<OutputLayout>().is_err());
    }

    #[test]
    fn test_artifact_starts_with_module_header_then_declarations() {
        let mut emitter = Emitter::new(OutputLayout::Flat);

        let artifact = emitter
            .emit_method(
                &method("GetItem"),
                &["use crate::pb::catalog::v1;".to_string()],
                "fn body() {}\n",
            )
            .unwrap();

        assert_eq!(artifact.path, "getitem.rs");
        assert_eq!(
            artifact.content,
            "//! Module `getitem` generated from `catalog.v1.Catalog.GetItem`.\n\n\
             use crate::pb::catalog::v1;\n\nfn body() {}\n"
        );
    }

    #[test]
    fn test_case_insensitive_collision_is_reported() {
        let mut emitter = Emitter::new(OutputLayout::Flat);

        emitter.emit_method(&method("GetItem"), &[], "").unwrap();
        let err = emitter.emit_method(&method("getitem"), &[], "").unwrap_err();

        assert_eq!(
            err,
            EmitError::Collision {
                path: "getitem.rs".to_string(),
                first: "catalog.v1.Catalog.GetItem".to_string(),
                second: "catalog.v1.Catalog.getitem".to_string(),
            }
        );
    }

    #[test]
    fn test_nested_layout_separates_services() {
        let mut emitter = Emitter::new(OutputLayout::Nested);
        let mut other = method("GetItem");
        other.service_name = "Inventory".to_string();
        other.full_name = "catalog.v1.Inventory.GetItem".to_string();

        assert!(emitter.emit_method(&method("GetItem"), &[], "").is_ok());
        assert_eq!(
            emitter.emit_method(&other, &[], "").unwrap().path,
            "inventory/getitem.rs"
        );
    }
}

//! # Data Model
//!
//! The records handed to the templates. They are plain, serializable snapshots of a
//! method or service, with every type reference already resolved against the import
//! scope of the artifact being rendered.
use crate::descriptor::{DescriptorError, StreamingDirection, TypeMapper, to_snake_ident, to_type_ident};
use crate::resolver::{ImportScope, derive_alternate_transport_path};
use heck::ToSnakeCase;
use prost_reflect::{MethodDescriptor, ServiceDescriptor};
use serde::Serialize;

/// Template context of a single RPC method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    /// Method name as declared in the proto file, e.g. `GetItem`.
    pub name: String,
    /// e.g. `catalog.v1.Catalog.GetItem`.
    pub full_name: String,
    pub service_name: String,
    /// Name tonic gives the method in the server trait, e.g. `get_item` or `r#type`.
    pub fn_name: String,
    /// snake_case name without raw identifier prefix, for composing helper names.
    pub snake_name: String,
    /// Associated stream type name in the server trait, e.g. `WatchItemsStream`.
    pub stream_type: String,
    pub input_type: String,
    pub output_type: String,
    pub streaming: StreamingDirection,
    /// Alias of the proto file's module inside the artifact.
    pub module_alias: String,
    pub struct_name: String,
    pub service_module: String,
}

/// Template context of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub name: String,
    pub full_name: String,
    /// tonic server trait, e.g. `Catalog`.
    pub trait_name: String,
    /// The generated implementation struct, e.g. `CatalogService`.
    pub struct_name: String,
    /// tonic server module, e.g. `catalog_server`.
    pub server_module: String,
    pub primary_module_path: String,
    pub alternate_transport_path: String,
    pub module_alias: String,
    pub methods: Vec<Method>,
}

/// Names derived from a service, shared by the service record and its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNames {
    pub name: String,
    pub full_name: String,
    pub trait_name: String,
    pub struct_name: String,
    pub server_module: String,
    /// Module name of the service artifact, as seen from the method artifacts.
    pub service_module: String,
}

impl ServiceNames {
    pub fn new(service: &ServiceDescriptor, service_module: impl Into<String>) -> Self {
        let trait_name = to_type_ident(service.name());

        Self {
            name: service.name().to_string(),
            full_name: service.full_name().to_string(),
            struct_name: format!("{}Service", trait_name.trim_end_matches('_')),
            server_module: format!("{}_server", service.name().to_snake_case()),
            trait_name,
            service_module: service_module.into(),
        }
    }
}

/// Builds the record of `method`, resolving its types in `scope`.
pub fn build_method(
    method: &MethodDescriptor,
    service: &ServiceNames,
    scope: &mut ImportScope,
    types: &TypeMapper,
) -> Result<Method, DescriptorError> {
    let input_type = scope.resolve(&types.message_type(&method.input())?);
    let output_type = scope.resolve(&types.message_type(&method.output())?);
    let module_alias = scope.alias_for(&types.file_module(&method.parent_file())?);

    Ok(Method {
        name: method.name().to_string(),
        full_name: method.full_name().to_string(),
        service_name: service.name.clone(),
        fn_name: to_snake_ident(method.name()),
        snake_name: method.name().to_snake_case(),
        stream_type: format!("{}Stream", to_type_ident(method.name()).trim_end_matches('_')),
        input_type,
        output_type,
        streaming: StreamingDirection::from(method),
        module_alias,
        struct_name: service.struct_name.clone(),
        service_module: service.service_module.clone(),
    })
}

/// Builds the record of `service` from its already built `methods`.
pub fn build_service(
    service: &ServiceDescriptor,
    names: &ServiceNames,
    methods: Vec<Method>,
    scope: &mut ImportScope,
    types: &TypeMapper,
    alternate_transport_suffix: &str,
) -> Result<Service, DescriptorError> {
    let primary_module = types.file_module(&service.parent_file())?;
    let alternate_module =
        derive_alternate_transport_path(&primary_module, alternate_transport_suffix);

    Ok(Service {
        name: names.name.clone(),
        full_name: names.full_name.clone(),
        trait_name: names.trait_name.clone(),
        struct_name: names.struct_name.clone(),
        server_module: names.server_module.clone(),
        primary_module_path: primary_module.to_string(),
        alternate_transport_path: alternate_module.to_string(),
        module_alias: scope.alias_for(&primary_module),
        methods,
    })
}

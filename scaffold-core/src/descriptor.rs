//! # Descriptor View
//!
//! Read-only access to the schema handed over by `protoc`.
//!
//! The request's `proto_file` list is loaded into a [`prost_reflect::DescriptorPool`],
//! which gives a navigable File -> Service -> Method graph. This module also knows how
//! `prost` lays out the Rust types generated for each message, so the rest of the
//! pipeline only deals with [`RustType`]s and [`ModulePath`]s.
use crate::resolver::{ModulePath, RustType};
use heck::{ToSnakeCase, ToUpperCamelCase};
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor, MethodDescriptor};
use prost_types::{FileDescriptorSet, compiler::CodeGeneratorRequest};
use serde::Serialize;
use std::fmt;

const WELL_KNOWN_PACKAGE: &str = "google.protobuf";
const WELL_KNOWN_CRATE: &str = "prost_types";
const EMPTY_MESSAGE: &str = "google.protobuf.Empty";

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Failed to build a descriptor pool from the request")]
    InvalidDescriptors(#[from] prost_reflect::DescriptorError),

    #[error("File '{0}' was requested for generation but its descriptor is missing")]
    MissingFile(String),

    #[error("'{symbol}' (declared in '{file}') has no package, cannot derive its module")]
    MissingPackage { symbol: String, file: String },
}

/// The streaming cardinality of a method, derived from its descriptor flags only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingDirection {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

impl StreamingDirection {
    pub fn from_flags(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => StreamingDirection::Unary,
            (false, true) => StreamingDirection::ServerStreaming,
            (true, false) => StreamingDirection::ClientStreaming,
            (true, true) => StreamingDirection::BidiStreaming,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingDirection::Unary => "unary",
            StreamingDirection::ServerStreaming => "server_streaming",
            StreamingDirection::ClientStreaming => "client_streaming",
            StreamingDirection::BidiStreaming => "bidi_streaming",
        }
    }
}

impl From<&MethodDescriptor> for StreamingDirection {
    fn from(method: &MethodDescriptor) -> Self {
        StreamingDirection::from_flags(method.is_client_streaming(), method.is_server_streaming())
    }
}

impl fmt::Display for StreamingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decoded schema of a single `CodeGeneratorRequest`.
#[derive(Debug, Clone)]
pub struct RequestView {
    pool: DescriptorPool,
    files_to_generate: Vec<String>,
}

impl RequestView {
    /// Builds the descriptor pool from every file in the request.
    ///
    /// # Returns
    ///
    /// * `Ok(RequestView)` - The navigable schema.
    /// * `Err(DescriptorError)` - If the descriptors are inconsistent (unknown types,
    ///   missing imports, duplicated symbols...).
    pub fn new(request: &CodeGeneratorRequest) -> Result<Self, DescriptorError> {
        let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
            file: request.proto_file.clone(),
        })?;

        Ok(Self {
            pool,
            files_to_generate: request.file_to_generate.clone(),
        })
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// The files `protoc` asked us to generate for, in request order.
    pub fn files_to_generate(&self) -> Result<Vec<FileDescriptor>, DescriptorError> {
        self.files_to_generate
            .iter()
            .map(|name| {
                self.pool
                    .get_file_by_name(name)
                    .ok_or_else(|| DescriptorError::MissingFile(name.clone()))
            })
            .collect()
    }
}

/// Maps protobuf symbols to the Rust items `prost` generates for them.
///
/// Packages become nested modules under `types_root` (`catalog.v1` ->
/// `crate::pb::catalog::v1`), nested messages live in a module named after their parent
/// message, and well-known types come from `prost_types`.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    types_root: ModulePath,
}

impl TypeMapper {
    pub fn new(types_root: ModulePath) -> Self {
        Self { types_root }
    }

    /// The module holding the types generated for `file`.
    pub fn file_module(&self, file: &FileDescriptor) -> Result<ModulePath, DescriptorError> {
        self.package_module(file.package_name(), file.name(), file.name())
    }

    /// The Rust type generated for `message`.
    pub fn message_type(&self, message: &MessageDescriptor) -> Result<RustType, DescriptorError> {
        let mut module = if message.package_name() == WELL_KNOWN_PACKAGE {
            if message.full_name() == EMPTY_MESSAGE {
                return Ok(RustType::Unit);
            }
            ModulePath::parse(WELL_KNOWN_CRATE)
        } else {
            let file = message.parent_file();
            self.package_module(message.package_name(), message.full_name(), file.name())?
        };

        let mut parents = Vec::new();
        let mut current = message.parent_message();
        while let Some(parent) = current {
            parents.push(to_snake_ident(parent.name()));
            current = parent.parent_message();
        }
        for parent in parents.into_iter().rev() {
            module = module.join(parent);
        }

        Ok(RustType::Path {
            module,
            name: to_type_ident(message.name()),
        })
    }

    fn package_module(
        &self,
        package: &str,
        symbol: &str,
        file: &str,
    ) -> Result<ModulePath, DescriptorError> {
        if package.is_empty() {
            return Err(DescriptorError::MissingPackage {
                symbol: symbol.to_string(),
                file: file.to_string(),
            });
        }

        Ok(package
            .split('.')
            .fold(self.types_root.clone(), |module, segment| {
                module.join(to_snake_ident(segment))
            }))
    }
}

/// Converts a protobuf name into a snake_case Rust identifier, the way `prost` does.
pub fn to_snake_ident(name: &str) -> String {
    escape_keyword(name.to_snake_case())
}

/// Converts a protobuf name into an UpperCamelCase Rust identifier, the way `prost` does.
pub fn to_type_ident(name: &str) -> String {
    escape_keyword(name.to_upper_camel_case())
}

/// The Rust module a lower-cased artifact file name (e.g. `match.rs`) is declared as.
pub fn to_module_ident(name: &str) -> String {
    escape_keyword(name.to_lowercase())
}

fn escape_keyword(ident: String) -> String {
    match ident.as_str() {
        // Keywords that cannot be raw identifiers.
        "crate" | "self" | "super" | "Self" | "extern" => format!("{ident}_"),
        "abstract" | "as" | "async" | "await" | "become" | "box" | "break" | "const"
        | "continue" | "do" | "dyn" | "else" | "enum" | "false" | "final" | "fn" | "for"
        | "gen" | "if" | "impl" | "in" | "let" | "loop" | "macro" | "match" | "mod" | "move"
        | "mut" | "override" | "priv" | "pub" | "ref" | "return" | "static" | "struct"
        | "trait" | "true" | "try" | "type" | "typeof" | "unsafe" | "unsized" | "use"
        | "virtual" | "where" | "while" | "yield" => format!("r#{ident}"),
        _ => ident,
    }
}

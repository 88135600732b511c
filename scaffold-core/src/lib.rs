//! # Scaffold Core
//!
//! `scaffold-core` is the library behind the `protoc-gen-scaffold` plugin. It turns the
//! services declared in a set of Protobuf files into Rust scaffolding for `tonic`
//! servers: one source file per RPC method and one per service.
//!
//! ## Pipeline
//!
//! * **[`descriptor`]:** Reads the `CodeGeneratorRequest` into a navigable
//!   `prost_reflect::DescriptorPool` and maps messages to the types `prost` generates.
//! * **[`resolver`]:** Per-artifact import scopes. Turns type references into valid
//!   expressions (`v1::Item`) and records the `use` declarations they need.
//! * **[`template`]:** Picks the template of each role (override, template directory or
//!   bundled default).
//! * **[`model`]:** Builds the [`Method`](model::Method) and [`Service`](model::Service)
//!   records the templates are rendered with.
//! * **[`render`]:** Renders the records with `tera`.
//! * **[`emit`]:** Lays out output paths and detects naming collisions.
//! * **[`normalize`]:** Formats every artifact and rewrites its `use` declarations into a
//!   single sorted block without unused entries.
//! * **[`generator`]:** Runs all of the above for a request and builds the response.
//!
//! ## Example
//!
//! ```rust,no_run
//! use scaffold_core::config::GeneratorConfig;
//! use scaffold_core::generator;
//! use scaffold_core::prost_types::compiler::CodeGeneratorRequest;
//!
//! let request = CodeGeneratorRequest::default();
//! let response = generator::run(GeneratorConfig::default(), &request);
//! assert!(response.error.is_none());
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports `prost-reflect`, `prost-types` and `tera` so that consumers
//! use compatible versions of these underlying dependencies.
pub mod config;
pub mod descriptor;
pub mod emit;
pub mod generator;
pub mod model;
pub mod normalize;
pub mod render;
pub mod resolver;
pub mod template;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use prost_reflect;
pub use prost_types;
pub use tera;

//! # Generator
//!
//! Drives a whole plugin run. For every file `protoc` asked for, every service in it and
//! every method of that service (always in declaration order) the generator:
//!
//! 1. opens a fresh [`ImportScope`] for the artifact,
//! 2. builds the [`Method`](crate::model::Method) record,
//! 3. renders it with the template of its streaming direction,
//! 4. emits it under its output path,
//! 5. normalizes the result.
//!
//! The service artifact follows the same steps once all of its methods are done.
//!
//! The run is all-or-nothing: the first error aborts it and no file is returned.
use crate::config::GeneratorConfig;
use crate::descriptor::{DescriptorError, RequestView, TypeMapper, to_module_ident};
use crate::emit::{EmitError, Emitter, RawArtifact};
use crate::model::{ServiceNames, build_method, build_service};
use crate::normalize::{NormalizeError, normalize};
use crate::render::{RenderError, Renderer};
use crate::resolver::{ImportScope, ModulePath};
use crate::template::{TemplateError, TemplateRole};
use prost_reflect::ServiceDescriptor;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid request")]
    Descriptor(#[from] DescriptorError),

    #[error("Template error")]
    Template(#[from] TemplateError),

    #[error("Render error")]
    Render(#[from] RenderError),

    #[error("Naming collision")]
    Emit(#[from] EmitError),

    #[error("Failed to normalize '{path}'")]
    Normalize {
        path: String,
        #[source]
        source: NormalizeError,
    },
}

/// A finished artifact, ready to be handed back to `protoc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the plugin's output directory.
    pub name: String,
    pub content: String,
}

impl From<GeneratedFile> for File {
    fn from(file: GeneratedFile) -> Self {
        File {
            name: Some(file.name),
            content: Some(file.content),
            ..Default::default()
        }
    }
}

/// A configured generator. Templates are resolved and parsed on construction.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    renderer: Renderer,
    types: TypeMapper,
}

impl Generator {
    /// Creates a generator, loading the template of every role.
    ///
    /// # Returns
    ///
    /// * `Ok(Generator)` - Ready to process requests.
    /// * `Err(GenerateError::Template)` - If an override or template directory file cannot
    ///   be read, or a template does not parse.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let renderer = Renderer::load(&config.templates)?;
        let types = TypeMapper::new(config.types_root.clone());

        Ok(Self {
            config,
            renderer,
            types,
        })
    }

    /// Generates the artifacts of every method and service in `request`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<GeneratedFile>)` - One file per method plus one per service, in
    ///   file -> service -> method order.
    /// * `Err(GenerateError)` - The first error encountered. Nothing is returned alongside.
    pub fn generate(
        &self,
        request: &CodeGeneratorRequest,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let view = RequestView::new(request)?;
        let mut emitter = Emitter::new(self.config.layout);
        let mut files = Vec::new();

        for file in view.files_to_generate()? {
            tracing::debug!(file = file.name(), "generating file");

            for service in file.services() {
                self.generate_service(&service, &mut emitter, &mut files)?;
            }
        }

        Ok(files)
    }

    fn generate_service(
        &self,
        service: &ServiceDescriptor,
        emitter: &mut Emitter,
        files: &mut Vec<GeneratedFile>,
    ) -> Result<(), GenerateError> {
        let layout = emitter.layout();
        let names = ServiceNames::new(service, layout.service_module(service.name()));

        for method in service.methods() {
            let path = layout.method_path(service.name(), method.name());
            let mut scope = ImportScope::new(self.artifact_module(&path));

            let record = build_method(&method, &names, &mut scope, &self.types)?;
            let body = self.renderer.render_method(&record)?;
            let raw = emitter.emit_method(&record, scope.declarations(), &body)?;

            let role = TemplateRole::for_direction(record.streaming);
            files.push(self.finish(raw, role)?);
        }

        // Method records are rebuilt so their type expressions resolve in this artifact.
        let path = layout.service_path(service.name());
        let mut scope = ImportScope::new(self.artifact_module(&path));

        let methods = service
            .methods()
            .map(|method| build_method(&method, &names, &mut scope, &self.types))
            .collect::<Result<Vec<_>, _>>()?;
        let record = build_service(
            service,
            &names,
            methods,
            &mut scope,
            &self.types,
            &self.config.alternate_transport_suffix,
        )?;
        let body = self.renderer.render_service(&record)?;
        let raw = emitter.emit_service(&record, scope.declarations(), &body)?;
        files.push(self.finish(raw, TemplateRole::Service)?);

        tracing::info!(
            service = service.full_name(),
            methods = record.methods.len(),
            "generated service scaffolding"
        );

        Ok(())
    }

    fn finish(&self, raw: RawArtifact, role: TemplateRole) -> Result<GeneratedFile, GenerateError> {
        let content = normalize(&raw.content).map_err(|source| GenerateError::Normalize {
            path: raw.path.clone(),
            source,
        })?;

        tracing::debug!(path = %raw.path, %role, "generated artifact");

        Ok(GeneratedFile {
            name: raw.path,
            content,
        })
    }

    /// The Rust module an artifact at `path` (e.g. `catalog/getitem.rs`) becomes.
    fn artifact_module(&self, path: &str) -> ModulePath {
        let path = path.strip_suffix(".rs").unwrap_or(path);
        path.split('/')
            .fold(self.config.scaffold_module.clone(), |module, segment| {
                module.join(to_module_ident(segment))
            })
    }
}

/// Runs a whole plugin invocation and builds the response for `protoc`.
///
/// Errors never escape: they are reported through the response's `error` field, which
/// carries no files.
pub fn run(config: GeneratorConfig, request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let result = Generator::new(config).and_then(|generator| generator.generate(request));

    match result {
        Ok(files) => CodeGeneratorResponse {
            supported_features: Some(Feature::Proto3Optional as u64),
            file: files.into_iter().map(File::from).collect(),
            ..Default::default()
        },
        Err(err) => {
            tracing::debug!(error = ?err, "generation failed");
            error_response(error_chain(&err))
        }
    }
}

/// `err` followed by every error of its source chain, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

/// A response reporting `message` to `protoc`, without any file.
pub fn error_response(message: impl Into<String>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error: Some(message.into()),
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    }
}

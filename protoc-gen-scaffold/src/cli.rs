//! # Plugin Parameters
//!
//! `protoc` hands the plugin a single parameter string (`--scaffold_opt=k=v,k=v`). Each
//! `k=v` pair is turned into a `--k=v` argument and parsed with `clap`, so unknown
//! options and malformed values are rejected the same way a CLI would reject them.
//!
//! An option given with an empty value (`serviceTemplate=`) counts as unset.
use clap::Parser;
use scaffold_core::config::{
    DEFAULT_ALTERNATE_TRANSPORT_SUFFIX, DEFAULT_SCAFFOLD_MODULE, DEFAULT_TYPES_ROOT,
    GeneratorConfig, TemplateConfig, TemplateOverrides,
};
use scaffold_core::emit::OutputLayout;
use scaffold_core::resolver::ModulePath;
use std::path::PathBuf;

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(
    name = "protoc-gen-scaffold",
    no_binary_name = true,
    disable_help_flag = true,
    about = "Scaffolds tonic service implementations from .proto services"
)]
pub struct Parameters {
    /// Template for unary methods
    #[arg(long = "unaryMethodTemplate")]
    pub unary_method_template: Option<String>,

    /// Template for client streaming methods
    #[arg(long = "clientStreamMethodTemplate")]
    pub client_stream_method_template: Option<String>,

    /// Template for server streaming methods
    #[arg(long = "serverStreamMethodTemplate")]
    pub server_stream_method_template: Option<String>,

    /// Template for bidirectional streaming methods
    #[arg(long = "bidiStreamMethodTemplate")]
    pub bidi_stream_method_template: Option<String>,

    /// Template for services
    #[arg(long = "serviceTemplate")]
    pub service_template: Option<String>,

    /// Directory replacing every bundled template with its own files
    #[arg(long = "templateDirectory")]
    pub template_directory: Option<String>,

    /// Output layout: `flat` or `nested`
    #[arg(long, value_parser = parse_layout)]
    pub layout: Option<OutputLayout>,

    /// Module the prost generated packages live under (e.g. crate::pb)
    #[arg(long = "typesRoot")]
    pub types_root: Option<String>,

    /// Module the generated scaffolding is placed in (e.g. crate::service)
    #[arg(long = "scaffoldModule")]
    pub scaffold_module: Option<String>,

    /// Suffix of the alternate transport module (e.g. _connect)
    #[arg(long = "alternateTransportSuffix")]
    pub alternate_transport_suffix: Option<String>,
}

impl Parameters {
    /// Parses the raw `protoc` parameter string.
    pub fn parse_parameter(parameter: &str) -> Result<Self, clap::Error> {
        let args = parameter
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| format!("--{pair}"));

        Self::try_parse_from(args)
    }

    pub fn into_config(self) -> GeneratorConfig {
        GeneratorConfig {
            templates: TemplateConfig {
                overrides: TemplateOverrides {
                    unary_method: path(self.unary_method_template),
                    server_stream_method: path(self.server_stream_method_template),
                    client_stream_method: path(self.client_stream_method_template),
                    bidi_stream_method: path(self.bidi_stream_method_template),
                    service: path(self.service_template),
                },
                directory: path(self.template_directory),
            },
            layout: self.layout.unwrap_or_default(),
            types_root: ModulePath::parse(&or_default(self.types_root, DEFAULT_TYPES_ROOT)),
            scaffold_module: ModulePath::parse(&or_default(
                self.scaffold_module,
                DEFAULT_SCAFFOLD_MODULE,
            )),
            alternate_transport_suffix: or_default(
                self.alternate_transport_suffix,
                DEFAULT_ALTERNATE_TRANSPORT_SUFFIX,
            ),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn path(value: Option<String>) -> Option<PathBuf> {
    non_empty(value).map(PathBuf::from)
}

fn or_default(value: Option<String>, default: &str) -> String {
    non_empty(value).unwrap_or_else(|| default.to_string())
}

fn parse_layout(value: &str) -> Result<OutputLayout, String> {
    if value.trim().is_empty() {
        return Ok(OutputLayout::default());
    }

    value.trim().parse()
}

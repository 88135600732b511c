//! # protoc-gen-scaffold Entry Point
//!
//! The executable `protoc` runs for `--scaffold_out`. It drives one plugin invocation:
//!
//! 1. **Decoding**: Reads the `CodeGeneratorRequest` from standard input.
//! 2. **Configuration**: Parses the request's parameter string using [`cli::Parameters`].
//! 3. **Generation**: Delegates to [`scaffold_core::generator`].
//! 4. **Encoding**: Writes the `CodeGeneratorResponse` to standard output.
//!
//! Generation failures travel back to `protoc` inside the response, so the process
//! only exits with a failure code when the request or response cannot be transferred.
//! Standard output carries the protocol; logs and errors go to standard error.

mod cli;
mod formatter;

use anyhow::Context;
use cli::Parameters;
use formatter::{FormattedString, GenericError};
use prost::Message;
use scaffold_core::generator;
use scaffold_core::prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use std::io::{self, Read, Write};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("Failed to read the request from stdin")?;

    let request = CodeGeneratorRequest::decode(input.as_slice())
        .context("Failed to decode the CodeGeneratorRequest")?;

    let response = respond(&request);

    if let Some(error) = &response.error {
        eprintln!("{}", FormattedString::from(GenericError("Generation failed:", error)));
    } else {
        tracing::info!(files = response.file.len(), "generation finished");
    }

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response.encode_to_vec())
        .and_then(|()| stdout.flush())
        .context("Failed to write the response to stdout")?;

    Ok(())
}

fn respond(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    match Parameters::parse_parameter(request.parameter()) {
        Ok(parameters) => generator::run(parameters.into_config(), request),
        Err(err) => generator::error_response(format!(
            "Invalid plugin parameter: {}",
            err.to_string().trim_end()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_is_reported_in_the_response() {
        let request = CodeGeneratorRequest {
            parameter: Some("unknownOption=1".to_string()),
            ..Default::default()
        };

        let response = respond(&request);

        assert!(response.file.is_empty());
        assert!(
            response
                .error
                .unwrap()
                .starts_with("Invalid plugin parameter:")
        );
    }

    #[test]
    fn test_empty_request_generates_nothing() {
        let response = respond(&CodeGeneratorRequest::default());

        assert_eq!(response.error, None);
        assert!(response.file.is_empty());
        assert_eq!(response.supported_features, Some(1));
    }
}

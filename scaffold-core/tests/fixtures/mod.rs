//! In-memory descriptors shared by the integration tests.
#![allow(dead_code)]

use scaffold_core::prost_types::compiler::CodeGeneratorRequest;
use scaffold_core::prost_types::{
    DescriptorProto, FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto,
};

pub fn file(
    name: &str,
    package: &str,
    dependencies: &[&str],
    messages: &[&str],
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: dependencies.iter().map(|d| d.to_string()).collect(),
        message_type: messages
            .iter()
            .map(|name| DescriptorProto {
                name: Some(name.to_string()),
                ..Default::default()
            })
            .collect(),
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        ..Default::default()
    }
}

pub fn unary(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    method(name, input, output, false, false)
}

pub fn server_stream(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    method(name, input, output, false, true)
}

pub fn client_stream(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    method(name, input, output, true, false)
}

pub fn bidi_stream(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    method(name, input, output, true, true)
}

fn method(
    name: &str,
    input: &str,
    output: &str,
    client_streaming: bool,
    server_streaming: bool,
) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        client_streaming: Some(client_streaming),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

pub fn request(files: Vec<FileDescriptorProto>, to_generate: &[&str]) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: to_generate.iter().map(|f| f.to_string()).collect(),
        proto_file: files,
        ..Default::default()
    }
}

/// `catalog.v1.Catalog` with a unary `GetItem` and a server streaming `WatchItems`.
pub fn catalog_request() -> CodeGeneratorRequest {
    catalog_request_with(vec![
        unary("GetItem", ".catalog.v1.GetItemRequest", ".catalog.v1.Item"),
        server_stream("WatchItems", ".catalog.v1.WatchItemsRequest", ".catalog.v1.Item"),
    ])
}

/// `catalog.v1.Catalog` with the given methods over the catalog messages.
pub fn catalog_request_with(methods: Vec<MethodDescriptorProto>) -> CodeGeneratorRequest {
    request(
        vec![file(
            "catalog.proto",
            "catalog.v1",
            &[],
            &["GetItemRequest", "WatchItemsRequest", "Item"],
            vec![service("Catalog", methods)],
        )],
        &["catalog.proto"],
    )
}

//! Builders for in-memory descriptors used by the unit tests.
use prost_types::{
    DescriptorProto, FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto,
    compiler::CodeGeneratorRequest,
};

pub fn file(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: (!package.is_empty()).then(|| package.to_string()),
        message_type: messages,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn message(name: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
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

pub fn method(
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

pub fn request(files: Vec<FileDescriptorProto>, to_generate: Vec<String>) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: to_generate,
        proto_file: files,
        ..Default::default()
    }
}

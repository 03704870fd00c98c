fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages are hand-written prost types in src/proto.rs, so only the
    // service plumbing is generated and no protoc is needed.
    let log_service = tonic_build::manual::Service::builder()
        .name("LogService")
        .package("logger")
        .method(
            tonic_build::manual::Method::builder()
                .name("log_info")
                .route_name("LogInfo")
                .input_type("crate::proto::RpcPayload")
                .output_type("crate::proto::LogReply")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[log_service]);
    Ok(())
}

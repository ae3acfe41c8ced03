pub mod model;

pub mod proto {
    pub mod interpreter {
        tonic::include_proto!("folio.interpreter");

        pub const FILE_DESCRIPTOR_SET: &[u8] =
            tonic::include_file_descriptor_set!("interpreter_descriptor");
    }
}

tonic::include_proto!("detection_bridge");

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("detection_bridge");

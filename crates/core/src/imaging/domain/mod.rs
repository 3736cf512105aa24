pub mod frame_decoder;
pub mod image_writer;
pub mod normalizer;

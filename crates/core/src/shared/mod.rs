pub mod bounding_box;
pub mod constants;
pub mod frame;
pub mod frame_payload;
pub mod model_resolver;
pub mod startup_error;
pub mod tensor_layout;

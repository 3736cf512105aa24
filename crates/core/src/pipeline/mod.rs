pub mod frame_pipeline;
pub mod infrastructure;
pub mod pipeline_error;
pub mod pipeline_logger;

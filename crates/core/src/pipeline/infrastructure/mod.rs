pub mod inference_pool;

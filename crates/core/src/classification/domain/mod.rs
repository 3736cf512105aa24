pub mod classifier;
pub mod label_catalog;
pub mod prediction;

pub mod classification;
pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod session;
pub mod shared;

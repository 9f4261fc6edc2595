pub mod document;
pub mod errors;
pub mod geometry;
pub mod mode;
pub mod stream;

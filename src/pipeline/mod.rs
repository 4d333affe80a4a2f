pub mod collector;
pub mod generator;
pub mod writer;

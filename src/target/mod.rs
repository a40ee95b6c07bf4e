//! Backend-facing output: the encoded dataflow, tensor files, and dataset directories

pub mod dataset;
pub mod df;
pub mod tensor_text;

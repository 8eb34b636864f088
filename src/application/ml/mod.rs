// Model/loader trait seams
pub mod sequence_model;

// ONNX Runtime implementation
pub mod onnx;

// Single-flight model lifecycle
pub mod runtime;

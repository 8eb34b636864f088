// Domain-specific error types
pub mod errors;

// Feature vocabulary shared between training artifacts and inference
pub mod feature_registry;

// Port interfaces
pub mod ports;

// Core data types
pub mod types;

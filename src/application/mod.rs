// Heuristic confidence scoring
pub mod confidence;

// Currency conversion with fallback
pub mod currency;

// Batch technical indicators
pub mod indicators;

// Model lifecycle and inference
pub mod ml;

// End-to-end prediction orchestration
pub mod prediction_service;

// Feature windowing and scaling
pub mod windowing;

// Mock collaborators for tests and offline runs
pub mod mock;

// Yahoo Finance market-data and exchange-rate client
pub mod yahoo;

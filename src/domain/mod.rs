pub mod batch;
pub mod error;
pub mod upload;

// CSV import module
pub mod csv;

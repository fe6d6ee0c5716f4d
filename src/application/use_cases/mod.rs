pub mod batch_executor;
pub mod csv_import;
pub mod operation_planner;
pub mod report_emitter;
pub mod upload_validator;

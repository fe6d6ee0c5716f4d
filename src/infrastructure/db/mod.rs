pub mod import_sink;
pub mod sqlite;

pub use import_sink::{ImportSink, SinkError, SqliteImportSink};

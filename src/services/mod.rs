pub mod header_locator;
pub mod source_reader;

pub use header_locator::locate_header;
pub use source_reader::{read_source_rows, suggest_column_map, suggest_level, SourceTable};

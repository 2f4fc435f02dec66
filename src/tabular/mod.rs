// ABOUTME: Delimited tabular text support for remote exports and local files
// ABOUTME: Scanner handles quoting; records module maps rows onto Record values

pub mod records;
pub mod scanner;

pub use records::{parse_records, parse_rows, resolve_columns, PATH_COLUMN, RECORD_ID_COLUMN};
pub use scanner::{trim_quotes, RowScanner};

//! Record validation: raw bytes in, typed [`Dataset`] out.
//!
//! Steps, in order:
//! 1. Decode the bytes as text ([`decode_text`]).
//! 2. Drop blank lines and detect the field delimiter.
//! 3. Check the header for every required column.
//! 4. Parse the table with Polars, reading every column as text.
//! 5. Convert rows to [`DiamondRecord`]s, silently dropping incomplete or
//!    unparseable rows.

mod delimiter;
mod encoding;
mod sanitize;

pub use delimiter::{CANDIDATE_DELIMITERS, detect_delimiter};
pub use encoding::decode_text;

use crate::dataset::{Dataset, DiamondRecord};
use crate::error::{PipelineError, Result};
use crate::grades::Graded;
use crate::types::ValidationReport;
use crate::utils::{is_error_marker, parse_identifier, parse_numeric_string};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use sanitize::{clean_csv_content, deep_clean_quotes};
use std::io::Cursor;
use tracing::{debug, info};

/// Accepted names for the identifier column.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["id", "index"];

/// Columns every input must carry, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "cut", "color", "clarity", "price", "carat", "x", "y", "z", "depth",
];

/// Converts raw uploads into validated datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate raw tabular bytes.
    ///
    /// Fails with [`PipelineError::Encoding`] for binary input, with
    /// [`PipelineError::Parse`] when the table itself is malformed (for
    /// example an unterminated quote) and with [`PipelineError::Schema`]
    /// when required columns are absent. Incomplete
    /// rows are dropped and counted in the returned report.
    pub fn validate(&self, raw: &[u8]) -> Result<(Dataset, ValidationReport)> {
        let text = decode_text(raw)?;
        let content = clean_csv_content(text);

        let Some(header_line) = content.lines().next() else {
            return Err(PipelineError::missing_columns(REQUIRED_COLUMNS));
        };

        let delimiter = detect_delimiter(&content);
        let header = parse_header(header_line, delimiter);
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| !header.iter().any(|h| h == name))
            .collect();
        if !missing.is_empty() {
            debug!("Header {:?} lacks {:?}", header, missing);
            return Err(PipelineError::missing_columns(missing));
        }

        let df = read_table(content, delimiter)?;
        let columns = ColumnMap::resolve(&df)?;

        info!(
            "Read {} rows x {} columns (delimiter {:?})",
            df.height(),
            df.width(),
            delimiter as char
        );

        let (records, mut report) = self.convert_rows(&df, &columns, delimiter != b',')?;
        report.delimiter = delimiter as char;

        info!(
            "Validation kept {} of {} rows ({} incomplete, {} invalid)",
            report.rows_accepted,
            report.rows_read,
            report.rows_dropped_incomplete,
            report.rows_dropped_invalid
        );

        Ok((Dataset::new(records), report))
    }

    fn convert_rows(
        &self,
        df: &DataFrame,
        columns: &ColumnMap,
        allow_decimal_comma: bool,
    ) -> Result<(Vec<DiamondRecord>, ValidationReport)> {
        let ids = match &columns.identifier {
            Some(name) => Some(string_values(df, name)?),
            None => None,
        };
        let required: Vec<Vec<Option<&str>>> = columns
            .required
            .iter()
            .map(|name| string_values(df, name))
            .collect::<Result<_>>()?;

        let mut report = ValidationReport {
            rows_read: df.height(),
            ids_synthesized: ids.is_none(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(df.height());

        for row in 0..df.height() {
            let id_cell = ids.as_ref().map(|values| values[row]);
            let cells: Vec<Option<&str>> = required.iter().map(|values| values[row]).collect();

            let incomplete = cells.iter().any(|cell| cell.is_none_or(is_error_marker))
                || id_cell.is_some_and(|cell| cell.is_none_or(is_error_marker));
            if incomplete {
                report.rows_dropped_incomplete += 1;
                continue;
            }

            let id = match id_cell {
                Some(cell) => cell.and_then(|c| parse_identifier(&deep_clean_quotes(c))),
                None => Some(row as u64 + 1),
            };
            match id.and_then(|id| parse_record(id, &cells, allow_decimal_comma)) {
                Some(record) => records.push(record),
                None => report.rows_dropped_invalid += 1,
            }
        }

        debug!(
            "{} rows incomplete, {} rows invalid",
            report.rows_dropped_incomplete, report.rows_dropped_invalid
        );
        report.rows_accepted = records.len();
        Ok((records, report))
    }
}

/// Lower-cased, unquoted header names.
fn parse_header(line: &str, delimiter: u8) -> Vec<String> {
    line.split(delimiter as char)
        .map(|name| deep_clean_quotes(name).to_ascii_lowercase())
        .collect()
}

fn read_table(content: String, delimiter: u8) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(delimiter)
                .with_quote_char(Some(b'"'))
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(content.into_bytes()))
        .finish()
        .map_err(|e| {
            debug!("CSV reader failed: {}", e);
            PipelineError::Parse(e.to_string())
        })
}

fn string_values<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let series = df.column(name)?.as_materialized_series();
    Ok(series.str()?.into_iter().collect())
}

/// Actual frame column names for the identifier and required fields.
struct ColumnMap {
    identifier: Option<String>,
    /// Same order as [`REQUIRED_COLUMNS`].
    required: Vec<String>,
}

impl ColumnMap {
    fn resolve(df: &DataFrame) -> Result<Self> {
        let names: Vec<(String, String)> = df
            .get_column_names()
            .into_iter()
            .map(|name| {
                let name = name.to_string();
                (deep_clean_quotes(&name).to_ascii_lowercase(), name)
            })
            .collect();
        let find = |wanted: &str| {
            names
                .iter()
                .find(|(normalized, _)| normalized == wanted)
                .map(|(_, original)| original.clone())
        };

        let mut required = Vec::with_capacity(REQUIRED_COLUMNS.len());
        let mut missing = Vec::new();
        for column in REQUIRED_COLUMNS {
            match find(column) {
                Some(original) => required.push(original),
                None => missing.push(column),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::missing_columns(missing));
        }

        Ok(Self {
            identifier: IDENTIFIER_COLUMNS.iter().find_map(|name| find(*name)),
            required,
        })
    }
}

/// Build a record from the required cells (in [`REQUIRED_COLUMNS`] order).
///
/// Returns `None` when a numeric cell cannot be parsed or price, carat or
/// depth is not positive.
fn parse_record(id: u64, cells: &[Option<&str>], allow_decimal_comma: bool) -> Option<DiamondRecord> {
    let text = |i: usize| cells[i].map(deep_clean_quotes);
    let number = |i: usize| {
        cells[i].and_then(|c| parse_numeric_string(&deep_clean_quotes(c), allow_decimal_comma))
    };

    let record = DiamondRecord {
        id,
        cut: Graded::parse(&text(0)?),
        color: Graded::parse(&text(1)?),
        clarity: Graded::parse(&text(2)?),
        price: number(3)?,
        carat: number(4)?,
        x: number(5)?,
        y: number(6)?,
        z: number(7)?,
        depth: number(8)?,
    };

    (record.price > 0.0 && record.carat > 0.0 && record.depth > 0.0).then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::{Clarity, Color, Cut};
    use pretty_assertions::assert_eq;

    const HEADER: &str = "id,carat,cut,color,clarity,depth,price,x,y,z";

    #[test]
    fn test_valid_table() {
        let csv = format!(
            "{HEADER}\n1,0.23,Ideal,E,SI2,61.5,326,3.95,3.98,2.43\n2,0.21,Premium,E,SI1,59.8,326,3.89,3.84,2.31\n"
        );
        let (dataset, report) = RecordValidator::new().validate(csv.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(report.rows_read, 2);
        assert_eq!(report.delimiter, ',');
        assert!(!report.ids_synthesized);

        let first = &dataset.records()[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.cut, Graded::Known(Cut::Ideal));
        assert_eq!(first.color, Graded::Known(Color::E));
        assert_eq!(first.clarity, Graded::Known(Clarity::Si2));
        assert_eq!(first.price, 326.0);
        assert_eq!(first.carat, 0.23);
    }

    #[test]
    fn test_missing_columns_are_all_listed() {
        let err = RecordValidator::new()
            .validate(b"name,age,city\nAnna,30,Oslo\n")
            .unwrap_err();
        assert_eq!(err.missing().unwrap(), &REQUIRED_COLUMNS.map(String::from));
    }

    #[test]
    fn test_partial_header_lists_only_missing() {
        let err = RecordValidator::new()
            .validate(b"cut,color,clarity,price,carat\nIdeal,E,SI1,300,0.3\n")
            .unwrap_err();
        assert_eq!(err.missing().unwrap(), &["x", "y", "z", "depth"].map(String::from));
    }

    #[test]
    fn test_empty_input_is_schema_error() {
        let err = RecordValidator::new().validate(b"\n  \n").unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
        assert_eq!(err.missing().unwrap().len(), REQUIRED_COLUMNS.len());
    }

    #[test]
    fn test_unterminated_quote_is_parse_error() {
        let mut csv = format!("{HEADER}\n");
        for i in 1..=12 {
            csv.push_str(&format!("{i},0.5,Ideal,E,SI1,60,1000,5,5,3\n"));
        }
        csv.push_str("99,0.5,\"Ideal,E,SI1,60,1000,5,5,3\n");

        let err = RecordValidator::new().validate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_binary_input_is_encoding_error() {
        let err = RecordValidator::new().validate(b"\x00\x00\x00").unwrap_err();
        assert_eq!(err.error_code(), "ENCODING_ERROR");
    }

    #[test]
    fn test_incomplete_and_invalid_rows_are_dropped() {
        let csv = format!(
            "{HEADER}\n\
             1,0.23,Ideal,E,SI2,61.5,326,3.95,3.98,2.43\n\
             2,0.21,NA,E,SI1,59.8,326,3.89,3.84,2.31\n\
             3,0.21,Premium,E,SI1,59.8,,3.89,3.84,2.31\n\
             4,abc,Premium,E,SI1,59.8,326,3.89,3.84,2.31\n\
             5,0.21,Premium,E,SI1,59.8,-4,3.89,3.84,2.31\n"
        );
        let (dataset, report) = RecordValidator::new().validate(csv.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_dropped_incomplete, 2);
        assert_eq!(report.rows_dropped_invalid, 2);
        assert_eq!(report.rows_accepted, 1);
    }

    #[test]
    fn test_ids_synthesized_from_position() {
        let csv = "carat,cut,color,clarity,depth,price,x,y,z\n\
                   0.23,Ideal,E,SI2,61.5,326,3.95,3.98,2.43\n\
                   0.21,Premium,E,SI1,59.8,326,3.89,3.84,2.31\n";
        let (dataset, report) = RecordValidator::new().validate(csv.as_bytes()).unwrap();
        assert!(report.ids_synthesized);
        let ids: Vec<u64> = dataset.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_index_column_and_header_case() {
        let csv = "Index;Carat;Cut;Color;Clarity;Depth;Price;X;Y;Z\n\
                   7;0,23;\"Very Good\";e;vs1;61,5;326;3,95;3,98;2,43\n";
        let (dataset, report) = RecordValidator::new().validate(csv.as_bytes()).unwrap();
        assert_eq!(report.delimiter, ';');
        let record = &dataset.records()[0];
        assert_eq!(record.id, 7);
        assert_eq!(record.cut, Graded::Known(Cut::VeryGood));
        assert_eq!(record.color, Graded::Known(Color::E));
        assert_eq!(record.carat, 0.23);
        assert_eq!(record.depth, 61.5);
    }

    #[test]
    fn test_unlisted_grades_survive_validation() {
        let csv = format!("{HEADER}\n1,0.23,Superb,E,SI2,61.5,326,3.95,3.98,2.43\n");
        let (dataset, _) = RecordValidator::new().validate(csv.as_bytes()).unwrap();
        assert_eq!(dataset.records()[0].cut, Graded::Unlisted("Superb".to_string()));
    }
}

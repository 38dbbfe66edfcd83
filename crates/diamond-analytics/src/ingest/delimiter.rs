//! Field delimiter detection.

use tracing::debug;

/// Delimiters considered, in order of preference on ties.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Lines inspected after the header.
const SAMPLE_LINES: usize = 20;

/// Guess the field delimiter of a table.
///
/// A candidate that splits the header and every sampled line into the same
/// number of fields wins, the widest split first. Otherwise the candidate
/// appearing most often in the header is used. Falls back to a comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return b',';
    };
    let sample: Vec<&str> = lines.take(SAMPLE_LINES).collect();

    let mut best_consistent: Option<(u8, usize)> = None;
    let mut best_header: Option<(u8, usize)> = None;

    for delimiter in CANDIDATE_DELIMITERS {
        let header_count = count_unquoted(header, delimiter);
        if header_count == 0 {
            continue;
        }

        let consistent = sample
            .iter()
            .all(|line| count_unquoted(line, delimiter) == header_count);
        if consistent && best_consistent.is_none_or(|(_, count)| header_count > count) {
            best_consistent = Some((delimiter, header_count));
        }
        if best_header.is_none_or(|(_, count)| header_count > count) {
            best_header = Some((delimiter, header_count));
        }
    }

    let delimiter = best_consistent
        .or(best_header)
        .map_or(b',', |(delimiter, _)| delimiter);
    debug!("Detected delimiter {:?}", delimiter as char);
    delimiter
}

/// Count occurrences of `delimiter` outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn test_semicolon_with_decimal_commas() {
        let text = "carat;price;depth\n0,5;1000;61,2\n0,7;1500;60,1\n";
        assert_eq!(detect_delimiter(text), b';');
    }

    #[test]
    fn test_tab_and_pipe() {
        assert_eq!(detect_delimiter("a\tb\n1\t2"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
    }

    #[test]
    fn test_quoted_delimiters_are_ignored() {
        let text = "cut;color\n\"Very Good; sort of\";E\n";
        assert_eq!(detect_delimiter(text), b';');
        assert_eq!(count_unquoted("\"a,b\",c", b','), 1);
    }

    #[test]
    fn test_single_column_defaults_to_comma() {
        assert_eq!(detect_delimiter("hello\nworld"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }
}

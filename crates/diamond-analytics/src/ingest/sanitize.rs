//! Text clean-up applied before and after parsing.

/// Drop blank lines and trim the rest.
pub(crate) fn clean_csv_content(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip surrounding quotes and whitespace from a cell, repeatedly.
///
/// Handles `"value"`, `'value'` and doubled or tripled quoting left behind
/// by spreadsheet round-trips.
pub(crate) fn deep_clean_quotes(value: &str) -> String {
    const MAX_PASSES: usize = 10;

    let mut cleaned = value.trim();
    for _ in 0..MAX_PASSES {
        let stripped = ["\"\"\"", "\"\"", "\"", "'"].iter().find_map(|quote| {
            cleaned
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
                .filter(|inner| !inner.is_empty())
        });
        match stripped {
            Some(inner) => cleaned = inner.trim(),
            None => break,
        }
    }

    cleaned.replace("\"\"", "").trim().to_string()
}

//! Markdown table row extraction.

/// Table row delimiter.
const ROW_PREFIX: char = '|';

/// Separator rows (`|---|---|`) carry no data.
const SEPARATOR_PREFIX: &str = "|---";

/// Extract the first-column names of the table opened by `header`.
///
/// The table starts at the first line containing `header` as a substring and
/// ends at the first non-empty line that does not begin with `|`. Separator
/// rows are skipped, as are rows with fewer than four `|`-separated segments
/// or an empty first column. Returns an empty list when `header` never
/// appears.
pub fn parse_table(content: &str, header: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut in_table = false;

    for line in content.split('\n') {
        // A repeated header inside the table is not a row.
        if line.contains(header) {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }

        if line.starts_with(SEPARATOR_PREFIX) {
            continue;
        }

        if line.starts_with(ROW_PREFIX) {
            let cells: Vec<&str> = line.split(ROW_PREFIX).map(str::trim).collect();
            if cells.len() >= 4 && !cells[1].is_empty() {
                rows.push(cells[1].to_string());
            }
            continue;
        }

        if !line.is_empty() {
            break;
        }
    }

    rows
}

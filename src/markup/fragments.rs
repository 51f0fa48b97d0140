// Stage one: find the rendered lines that carry comparison cells, pair them,
// and cut each logical row into cell texts. Nothing here knows what a cell means.

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRow {
    pub index: usize,
    pub raw: String,
}

pub fn filter_data_rows<'a>(markup: &'a str, row_marker: &str) -> Vec<&'a str> {
    markup
        .lines()
        .filter(|line| line.contains(row_marker))
        .map(str::trim)
        .collect()
}

/// Joins rows two by two; an odd count means truncated or re-laid-out output.
pub fn pair_rows(rows: &[&str]) -> Result<Vec<LogicalRow>, PipelineError> {
    if rows.len() % 2 != 0 {
        return Err(PipelineError::UnevenRowCount { count: rows.len() });
    }

    Ok(rows
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| LogicalRow {
            index: index + 1,
            raw: format!("{}{}", pair[0], pair[1]),
        })
        .collect())
}

/// Text of every `<td ...>` cell, tags stripped and whitespace collapsed.
/// A cell ends at its `</td>`, or at the next `<td`/`</tr` when the close tag is missing.
pub fn cell_texts(raw: &str) -> Vec<String> {
    let lc = to_lowercase_fast(raw);
    let mut cells = Vec::new();
    let mut cursor = 0;

    while let Some(open_rel) = lc[cursor..].find("<td") {
        let open = cursor + open_rel;
        let Some(open_end_rel) = raw[open..].find('>') else {
            break;
        };
        let content_start = open + open_end_rel + 1;

        let rest = &lc[content_start..];
        let content_end = ["</td", "<td", "</tr"]
            .iter()
            .filter_map(|pattern| rest.find(pattern))
            .min()
            .map(|rel| content_start + rel)
            .unwrap_or(raw.len());

        cells.push(normalize_ws(&normalize_entities(&strip_tags(
            &raw[content_start..content_end],
        ))));

        cursor = if lc[content_end..].starts_with("</td") {
            content_end + "</td".len()
        } else {
            content_end
        };
    }

    cells
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn normalize_entities(s: &str) -> String {
    s.replace("&nbsp;", " ").replace("&amp;", "&")
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

// ASCII-only so byte offsets stay aligned with the original text.
fn to_lowercase_fast(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_only_marker_lines_in_document_order() {
        let markup = "<table>\n<tr><td>Document</td></tr>\n<tr><td align=center>b</td>\n  <td align=center>0.5</td></tr>\n</table>";
        let rows = filter_data_rows(markup, "<td align=center>");
        assert_eq!(
            rows,
            vec!["<tr><td align=center>b</td>", "<td align=center>0.5</td></tr>"]
        );
    }

    #[test]
    fn pair_rows_rejects_odd_counts_with_the_count() {
        let err = pair_rows(&["a", "b", "c"]).unwrap_err();
        assert_eq!(err, PipelineError::UnevenRowCount { count: 3 });
    }

    #[test]
    fn pair_rows_concatenates_consecutive_rows() {
        let rows = pair_rows(&["a1", "a2", "b1", "b2"]).expect("even rows");
        assert_eq!(
            rows,
            vec![
                LogicalRow {
                    index: 1,
                    raw: "a1a2".to_string()
                },
                LogicalRow {
                    index: 2,
                    raw: "b1b2".to_string()
                },
            ]
        );
        assert!(pair_rows(&[]).expect("empty is even").is_empty());
    }

    #[test]
    fn cell_texts_strip_nested_tags_and_entities() {
        let cells = cell_texts(
            "<tr><TD align=center><b>TV&nbsp;screen</b></TD><td align=center> toast </td><td align=center>0.02</td></tr>",
        );
        assert_eq!(cells, vec!["TV screen", "toast", "0.02"]);
    }

    #[test]
    fn cell_texts_tolerate_missing_close_tags() {
        let cells = cell_texts("<td align=center>wall clock<td align=center>N/A</tr>");
        assert_eq!(cells, vec!["wall clock", "N/A"]);
    }
}

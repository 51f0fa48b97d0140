use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Terminator, Trim, WriterBuilder};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delim {
    Comma,
    Tab,
}

impl Delim {
    pub fn for_path(path: &Path) -> Self {
        let is_tab = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab"))
            .unwrap_or(false);
        if is_tab { Self::Tab } else { Self::Comma }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Tab => b'\t',
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DelimitedTable {
    /// First record is the header; data rows made only of blank cells are dropped.
    pub fn parse(text: &str, delim: Delim) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delim.as_byte())
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.to_string())
            .collect::<Vec<String>>();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(alias))
        })
    }

    pub fn cell<'a>(row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(|cell| cell.trim()).unwrap_or("")
    }
}

/// Renders a header plus rows; fields are quoted only when they need it.
pub fn render_rows<H, R, S>(header: &[H], rows: R, delim: Delim) -> Result<String>
where
    H: AsRef<str>,
    R: IntoIterator,
    R::Item: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(delim.as_byte())
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(header.iter().map(|cell| cell.as_ref()))
        .context("failed to write table header")?;
    for row in rows {
        writer
            .write_record(row.into_iter().map(|cell| cell.as_ref().to_string()))
            .context("failed to write table row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush table: {}", err.error()))?;
    String::from_utf8(bytes).context("table output is not valid utf-8")
}

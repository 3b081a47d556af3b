//! Bulk loading of reference data (ingredients, tags) from CSV.
//!
//! Rows are `name,measurement_unit` for ingredients and `name,color,slug`
//! for tags. Malformed rows are skipped with a warning; rows that already
//! exist are ignored. Each file is loaded in a single transaction.

use std::io::BufRead;

use tracing::{info, warn};

use crate::validation::is_hex_color;
use crate::{Database, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Split one CSV line. Fields may be double-quoted; `""` inside quotes is a
/// literal quote. Returns `None` on an unterminated quote.
pub fn split_csv_line(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    if in_quotes {
        return None;
    }
    fields.push(field);
    Some(fields)
}

/// Fields of a well-formed row: exactly `n` non-empty, trimmed fields.
fn row_fields(line: &str, n: usize) -> Option<Vec<String>> {
    let fields: Vec<String> = split_csv_line(line)?
        .into_iter()
        .map(|f| f.trim().to_string())
        .collect();
    (fields.len() == n && fields.iter().all(|f| !f.is_empty())).then_some(fields)
}

impl Database {
    pub fn import_ingredients<R: BufRead>(&self, reader: R) -> Result<ImportReport> {
        let report = self.import_rows(reader, "ingredients", |tx, line| {
            let Some(fields) = row_fields(line, 2) else {
                return Ok(None);
            };
            let changed = tx.execute(
                "INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES (?1, ?2)",
                (&fields[0], &fields[1]),
            )?;
            Ok(Some(changed > 0))
        })?;
        Ok(report)
    }

    pub fn import_tags<R: BufRead>(&self, reader: R) -> Result<ImportReport> {
        let report = self.import_rows(reader, "tags", |tx, line| {
            let Some(fields) = row_fields(line, 3) else {
                return Ok(None);
            };
            let (name, color, slug) = (&fields[0], &fields[1], &fields[2]);
            if !is_hex_color(color) {
                return Ok(None);
            }
            let changed = tx.execute(
                "INSERT OR IGNORE INTO tags (name, color, slug) VALUES (?1, ?2, ?3)",
                (name, color, slug),
            )?;
            Ok(Some(changed > 0))
        })?;
        Ok(report)
    }

    /// `insert` returns `None` for a malformed row, `Some(false)` for a
    /// duplicate and `Some(true)` for an inserted row.
    fn import_rows<R, F>(&self, reader: R, what: &str, mut insert: F) -> Result<ImportReport>
    where
        R: BufRead,
        F: FnMut(&rusqlite::Connection, &str) -> Result<Option<bool>>,
    {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;

        let report = self.with_tx(|tx| {
            let mut report = ImportReport::default();
            for (idx, line) in lines.iter().enumerate() {
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                match insert(tx, line)? {
                    Some(true) => report.inserted += 1,
                    Some(false) => report.duplicates += 1,
                    None => {
                        warn!("Skipping malformed {} row {}: {:?}", what, idx + 1, line);
                        report.malformed += 1;
                    }
                }
            }
            Ok(report)
        })?;

        info!(
            "Imported {}: {} inserted, {} already present, {} malformed",
            what, report.inserted, report.duplicates, report.malformed
        );
        Ok(report)
    }
}

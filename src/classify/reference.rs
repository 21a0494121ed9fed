//! Static name → abbreviation lookup table.
//!
//! The table is semicolon-delimited with columns `Titulo;Abreviatura;Tipo`.
//! A default copy is compiled into the binary; `--reference` can point at a
//! replacement file. Either way it is parsed once per run and only read after.

use std::collections::HashMap;
use std::path::Path;

use crate::classify::{classify, synthesize_abbreviation};
use crate::domain::{Abbreviation, AbbreviationSource, InstrumentType, TypeReference};
use crate::error::AppError;

const EMBEDDED_TABLE: &str = include_str!("../../assets/tipo.csv");

const COL_TITLE: &str = "titulo";
const COL_ABBREVIATION: &str = "abreviatura";
const COL_CATEGORY: &str = "tipo";

#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: Vec<TypeReference>,
    /// Title → index of its first row.
    by_title: HashMap<String, usize>,
}

impl ReferenceTable {
    /// The table shipped with the crate.
    pub fn embedded() -> Result<Self, AppError> {
        Self::parse(EMBEDDED_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::input(format!(
                "Failed to read reference table '{}': {e}",
                path.display()
            ))
        })?;
        Self::parse(&crate::io::ingest::decode_body(&bytes))
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::input(format!("Failed to read reference table headers: {e}")))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    AppError::input(format!(
                        "Reference table is missing column `{name}` (expected Titulo;Abreviatura;Tipo)."
                    ))
                })
        };
        let title_idx = column(COL_TITLE)?;
        let abbreviation_idx = column(COL_ABBREVIATION)?;
        let category_idx = column(COL_CATEGORY)?;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::input(format!("Reference table line {}: {e}", idx + 2))
            })?;

            let title = record.get(title_idx).unwrap_or("").trim();
            let abbreviation = record.get(abbreviation_idx).unwrap_or("").trim();
            if title.is_empty() || abbreviation.is_empty() {
                tracing::warn!(line = idx + 2, "skipping incomplete reference row");
                continue;
            }

            let category = record
                .get(category_idx)
                .and_then(InstrumentType::from_label)
                .unwrap_or_else(|| classify(title));

            rows.push(TypeReference {
                title: title.to_string(),
                abbreviation: abbreviation.to_string(),
                category,
            });
        }

        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<TypeReference>) -> Self {
        let mut by_title = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            by_title.entry(row.title.clone()).or_insert(idx);
        }
        Self { rows, by_title }
    }

    pub fn rows(&self) -> &[TypeReference] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact match on `"<name> <year>"`.
    pub fn exact(&self, name: &str, maturity_year: i32) -> Option<&TypeReference> {
        let title = crate::domain::group_key(name, maturity_year);
        self.by_title.get(&title).map(|&idx| &self.rows[idx])
    }

    /// Resolve a display abbreviation: exact, then partial, then synthesized.
    ///
    /// The partial step takes the first two tokens of the name as the type
    /// prefix (e.g. "Tesouro Prefixado") and returns the first row whose title
    /// contains both that prefix and the year. It is a heuristic: renamed or
    /// ambiguous instruments can match the wrong row.
    pub fn lookup(&self, name: &str, maturity_year: i32) -> Abbreviation {
        if let Some(row) = self.exact(name, maturity_year) {
            return Abbreviation {
                text: row.abbreviation.clone(),
                source: AbbreviationSource::Exact,
            };
        }

        let tokens: Vec<&str> = name.split_whitespace().take(2).collect();
        if tokens.len() == 2 {
            let prefix = tokens.join(" ");
            let year = maturity_year.to_string();
            if let Some(row) = self
                .rows
                .iter()
                .find(|row| row.title.contains(&prefix) && row.title.contains(&year))
            {
                return Abbreviation {
                    text: row.abbreviation.clone(),
                    source: AbbreviationSource::Partial,
                };
            }
        }

        Abbreviation {
            text: synthesize_abbreviation(name, maturity_year),
            source: AbbreviationSource::Synthesized,
        }
    }
}

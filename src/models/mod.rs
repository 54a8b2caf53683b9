use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ── Scraped fields ────────────────────────────────────────────────────────────

/// Raw per-ad fields pulled off a results page. Variant order is the column
/// order of the raw CSV snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Descr,
    Address,
    Price,
    Specs,
    Url,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "ad_title",
            Field::Descr => "ad_descr",
            Field::Address => "address",
            Field::Price => "price",
            Field::Specs => "specs",
            Field::Url => "ad_url",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Extraction errors ─────────────────────────────────────────────────────────

/// Fatal extraction failures. Any of these aborts the walk: a page that
/// yields no ads or ragged columns means the selector table no longer
/// matches the site.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no listing elements on page (selector `{selector}`)")]
    NoListings { selector: String },

    #[error("column `{field}` holds {found} values, expected {expected}")]
    ColumnMismatch {
        field: Field,
        expected: usize,
        found: usize,
    },

    #[error("unparsable selector `{selector}`: {detail}")]
    Selector { selector: String, detail: String },
}

// ── Page columns ──────────────────────────────────────────────────────────────

/// Columns extracted from a single results page: one value slot per ad
/// element. `push_column` refuses anything that is not exactly one value
/// per ad, so a ragged page cannot be constructed.
#[derive(Debug, Clone)]
pub struct PageRows {
    len: usize,
    columns: BTreeMap<Field, Vec<Option<String>>>,
}

impl PageRows {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push_column(
        &mut self,
        field: Field,
        values: Vec<Option<String>>,
    ) -> Result<(), ExtractError> {
        if values.len() != self.len {
            return Err(ExtractError::ColumnMismatch {
                field,
                expected: self.len,
                found: values.len(),
            });
        }
        self.columns.insert(field, values);
        Ok(())
    }
}

// ── Accumulated raw table ─────────────────────────────────────────────────────

/// Column-oriented accumulator over all walked pages.
#[derive(Debug, Default)]
pub struct RawTable {
    len: usize,
    columns: BTreeMap<Field, Vec<Option<String>>>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ads accumulated so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.columns.keys().copied()
    }

    /// Raw cell value; `None` for an absent cell or an unknown field.
    pub fn cell(&self, field: Field, row: usize) -> Option<&str> {
        self.columns.get(&field)?.get(row)?.as_deref()
    }

    /// Append one page worth of columns. Lengths are re-checked after the
    /// append: every column must land on the same total, or the page left a
    /// field out entirely.
    pub fn extend(&mut self, page: PageRows) -> Result<(), ExtractError> {
        let expected = self.len + page.len;
        for (field, mut values) in page.columns {
            let col = self.columns.entry(field).or_default();
            col.append(&mut values);
        }
        for (field, col) in &self.columns {
            if col.len() != expected {
                return Err(ExtractError::ColumnMismatch {
                    field: *field,
                    expected,
                    found: col.len(),
                });
            }
        }
        self.len = expected;
        Ok(())
    }
}

// ── Cleaned dataset row ───────────────────────────────────────────────────────

/// One cleaned listing. Field order here *is* the on-disk column order of
/// `scrape_data.csv` and the filtered report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub ad_title: Option<String>,
    pub ad_descr: Option<String>,
    pub address: Option<String>,
    pub price: Option<u32>,
    pub size_m2: Option<u32>,
    pub price_per_m2: Option<f64>,
    pub nr_rooms: Option<u32>,
    pub dist_to_station: Option<f64>,
    pub build_year: Option<u32>,
    pub scrape_date: NaiveDateTime,
    pub website: String,
    pub ad_url: Option<String>,
}

impl Listing {
    /// Identity used for dataset de-duplication: the same ad re-scraped on a
    /// later run must not produce a second row.
    pub fn dedup_key(&self) -> (Option<&str>, Option<u32>, Option<&str>, &str) {
        (
            self.ad_title.as_deref(),
            self.price,
            self.ad_url.as_deref(),
            &self.website,
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

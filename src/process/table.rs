// src/process/table.rs

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::NaiveDateTime;
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

use crate::process::merge::{MergedRow, ANNOUNCEMENT_FIELDS};

/// Column dropped from every table; it only names the results PDF.
pub const RESULTS_PDF_NAME: &str = "ResultsPDFName";

/// One row per auction, all cells string or null.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    /// Parsed auction date per row, kept in step with `rows`.
    dates: Vec<NaiveDateTime>,
}

impl AuctionTable {
    /// Outer-join the rows by column name. Columns appear in the order they
    /// are first seen; a row lacking a column holds null there.
    pub fn from_rows(rows: Vec<MergedRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (i, row) in rows.iter().enumerate() {
            let known = columns.len();
            for key in row.fields.keys() {
                if seen.insert(key.to_string()) {
                    columns.push(key.to_string());
                }
            }
            if i > 0 && columns.len() > known {
                debug!(
                    document = %row.source,
                    added = ?&columns[known..],
                    "schema drift: document adds columns"
                );
            }
            if row.fields.len() < known {
                debug!(
                    document = %row.source,
                    missing = known - row.fields.len(),
                    "schema drift: document lacks columns"
                );
            }
        }

        let mut cells = Vec::with_capacity(rows.len());
        let mut dates = Vec::with_capacity(rows.len());
        for row in rows {
            cells.push(
                columns
                    .iter()
                    .map(|c| row.fields.get(c).map(str::to_string))
                    .collect(),
            );
            dates.push(row.auction_date);
        }

        Self {
            columns,
            rows: cells,
            dates,
        }
    }

    /// All post-processing, in order: drop all-null columns, drop the PDF
    /// name, sort by auction date, pin the announcement columns first.
    pub fn normalize(self) -> Self {
        self.drop_empty_columns()
            .drop_column(RESULTS_PDF_NAME)
            .sort_by_auction_date()
            .pin_leading_columns()
    }

    /// Drop every column that is null in every row.
    pub fn drop_empty_columns(self) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&c| self.rows.iter().any(|r| r[c].is_some()))
            .collect();
        self.project(keep)
    }

    /// Drop `name` if present.
    pub fn drop_column(self, name: &str) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&c| self.columns[c] != name)
            .collect();
        self.project(keep)
    }

    /// Stable sort, ascending by parsed auction date.
    pub fn sort_by_auction_date(self) -> Self {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        let mut rows: Vec<Option<Vec<Option<String>>>> = self.rows.into_iter().map(Some).collect();
        let mut sorted_rows = Vec::with_capacity(rows.len());
        let mut sorted_dates = Vec::with_capacity(rows.len());
        for i in order {
            if let Some(row) = rows[i].take() {
                sorted_rows.push(row);
                sorted_dates.push(self.dates[i]);
            }
        }

        Self {
            columns: self.columns,
            rows: sorted_rows,
            dates: sorted_dates,
        }
    }

    /// Move `AuctionDate`, `SecurityTermWeekYear`, `SecurityTermDayMonth`
    /// to the front; everything else keeps its relative order.
    pub fn pin_leading_columns(self) -> Self {
        let position = |name: &str| self.columns.iter().position(|c| c == name);
        let mut keep: Vec<usize> = ANNOUNCEMENT_FIELDS
            .iter()
            .filter_map(|name| position(*name))
            .collect();
        keep.extend(
            (0..self.columns.len())
                .filter(|&c| !ANNOUNCEMENT_FIELDS.contains(&self.columns[c].as_str())),
        );
        self.project(keep)
    }

    fn project(self, keep: Vec<usize>) -> Self {
        let columns = keep.iter().map(|&c| self.columns[c].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| keep.iter().map(|&c| row[c].take()).collect())
            .collect();
        Self {
            columns,
            rows,
            dates: self.dates,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[Option<String>]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Cell at row `i`, column `name`; `None` for null or out of range.
    pub fn get(&self, i: usize, name: &str) -> Option<&str> {
        let c = self.column_index(name)?;
        self.rows.get(i)?.get(c)?.as_deref()
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let c = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[c].as_deref()).collect())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Convert to an Arrow batch: one nullable Utf8 field per column.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Schema::new(
            self.columns
                .iter()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        );
        let arrays: Vec<ArrayRef> = (0..self.columns.len())
            .map(|c| {
                let values: StringArray = self.rows.iter().map(|r| r[c].as_deref()).collect();
                Arc::new(values) as ArrayRef
            })
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows.len()));
        RecordBatch::try_new_with_options(Arc::new(schema), arrays, &options)
    }
}

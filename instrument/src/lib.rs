//! Records auction runs into column-oriented tables.
//!
//! A `tracing` subscriber turns every `info!` event into a row of the table
//! named after the event's target. Columns are created the first time a field
//! name shows up, so the schema follows whatever the auction emits.
//!
//! # Usage
//!
//! ```ignore
//! // In auction code:
//! tracing::info!(target: "price", round, market_id, price);
//!
//! // In a test:
//! let (outcome, recording) = instrument::record(|| run_auction(&graph, &config));
//! let prices = recording.table("price").unwrap().to_dataframe()?;
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// Values of one column. The variant is fixed by the first value recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::U64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            ColumnData::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ColumnData::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ColumnData::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            ColumnData::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            ColumnData::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Rows recorded under one tracing target.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: BTreeMap<String, ColumnData>,
    pub rows: usize,
}

impl Table {
    /// Pad every column to the current row count. Fields absent from an event
    /// read back as the type's zero value.
    fn align(&mut self) {
        for column in self.columns.values_mut() {
            column.fill_to(self.rows);
        }
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            ColumnData::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            ColumnData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            ColumnData::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, data)| match data {
                ColumnData::U64(v) => Column::new(name.as_str().into(), v),
                ColumnData::I64(v) => Column::new(name.as_str().into(), v),
                ColumnData::F64(v) => Column::new(name.as_str().into(), v),
                ColumnData::Bool(v) => Column::new(name.as_str().into(), v),
                ColumnData::Str(v) => Column::new(name.as_str().into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// All tables captured on the current thread, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub tables: HashMap<String, Table>,
}

impl Recording {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }

    pub fn rows(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.rows)
    }

    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }
}

thread_local! {
    static RECORDING: RefCell<Recording> = RefCell::default();
}

struct RowVisitor<'a> {
    table: &'a mut Table,
}

impl RowVisitor<'_> {
    fn column(&mut self, field: &Field, empty: impl FnOnce(usize) -> ColumnData) -> &mut ColumnData {
        let rows = self.table.rows;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(rows))
    }
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let ColumnData::U64(v) = self.column(field, |n| ColumnData::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let ColumnData::I64(v) = self.column(field, |n| ColumnData::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let ColumnData::F64(v) = self.column(field, |n| ColumnData::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let ColumnData::Bool(v) = self.column(field, |n| ColumnData::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let ColumnData::Str(v) = self.column(field, |n| ColumnData::Str(vec![String::new(); n])) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Subscriber that appends every info-level event to the thread-local recording.
/// Spans are accepted and ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        RECORDING.with(|r| {
            let mut recording = r.borrow_mut();
            let table = recording.tables.entry(target).or_default();
            table.align();
            event.record(&mut RowVisitor { table: &mut *table });
            table.rows += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the table subscriber as the process-wide default.
/// Later calls are no-ops once any global subscriber is set.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recording {
    RECORDING.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDING.with(|r| *r.borrow_mut() = Recording::default());
}

/// Run `f` with the table subscriber scoped to this thread and return what it
/// emitted. Safe to use from tests running in parallel.
pub fn record<R>(f: impl FnOnce() -> R) -> (R, Recording) {
    clear();
    let out = tracing::subscriber::with_default(TableSubscriber, f);
    (out, drain())
}

//! Filter, sort and present rows of a dataset for one render.
//!
//! Every function in here is pure. The screen owns a [`ViewState`] and runs
//! the pipeline again on each keystroke and sort toggle.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use derive_setters::Setters;
use tracing::trace;

use crate::domain::TTVError;

pub const STATUS_KEY: &str = "status";
pub const CAPACITY_KEY: &str = "capacity";
pub const ACTIVE_STATUS: &str = "Active";

/// A single cell. Integer columns stay exact, even past 2^53.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i128),
    Number(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Number(n) if n.is_infinite() && *n > 0.0 => f.write_str("Infinity"),
            Value::Number(n) if n.is_infinite() => f.write_str("-Infinity"),
            // Negative zero prints as plain 0
            Value::Number(n) if *n == 0.0 => f.write_str("0"),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i128::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(i128::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(i128::from(n))
    }
}

/// A record keyed by column key. Keys without a value are simply absent.
pub type Row = HashMap<String, Value>;

/// Build a row from `(key, value)` pairs.
pub fn row<K, V, I>(fields: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Text used for searching, absent values are empty.
pub fn cell_text(row: &Row, key: &str) -> String {
    row.get(key).map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(into)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub sortable: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Column {
            key: key.into(),
            label: label.into(),
            sortable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

impl FromStr for SortDirection {
    type Err = TTVError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            _ => Err(TTVError::InvalidSortDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub search: String,
    pub sort_key: Option<String>,
    pub sort_dir: SortDirection,
}

impl ViewState {
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        ViewState {
            search: search.into(),
            ..self.clone()
        }
    }

    /// Header click on `column`. The same key flips the direction, a new key
    /// starts ascending. Columns that are not sortable leave the state as is.
    pub fn toggle_sort(&self, column: &Column) -> Self {
        if !column.sortable {
            return self.clone();
        }
        let sort_dir = match &self.sort_key {
            Some(key) if *key == column.key => self.sort_dir.flip(),
            _ => SortDirection::Ascending,
        };
        ViewState {
            search: self.search.clone(),
            sort_key: Some(column.key.clone()),
            sort_dir,
        }
    }

    pub fn sorted_by(&self, key: impl Into<String>, sort_dir: SortDirection) -> Self {
        ViewState {
            search: self.search.clone(),
            sort_key: Some(key.into()),
            sort_dir,
        }
    }

    /// Arrow for the header of `key`, if the view is sorted by it.
    pub fn sort_marker(&self, key: &str) -> Option<&'static str> {
        match &self.sort_key {
            Some(k) if k == key => Some(self.sort_dir.arrow()),
            _ => None,
        }
    }
}

fn row_matches(row: &Row, columns: &[Column], term: &str) -> bool {
    columns
        .iter()
        .any(|c| cell_text(row, &c.key).to_lowercase().contains(term))
}

/// Positions of rows whose text in any column contains `search`, ignoring case.
pub fn filter_indices(rows: &[Row], columns: &[Column], search: &str) -> Vec<usize> {
    if search.is_empty() {
        return (0..rows.len()).collect();
    }
    let term = search.to_lowercase();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row_matches(row, columns, &term))
        .map(|(idx, _)| idx)
        .collect()
}

// Absent and NaN rank lowest, then numbers, then text.
fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Number(n)) if n.is_nan() => 0,
        Some(Value::Integer(_) | Value::Number(_)) => 1,
        Some(Value::Text(_)) => 2,
    }
}

// Exact comparison of an integer with a float that is not NaN.
fn compare_integer_float(i: i128, f: f64) -> Ordering {
    if f.is_infinite() {
        return if f > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    match (i as f64).partial_cmp(&f) {
        // Equal after rounding means f is integral, so the cast back is exact
        Some(Ordering::Equal) => i.cmp(&(f as i128)),
        Some(ord) => ord,
        None => Ordering::Equal,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        // NaN never gets here, see sort_rank
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Integer(i), Value::Number(f)) => compare_integer_float(*i, *f),
        (Value::Number(f), Value::Integer(i)) => compare_integer_float(*i, *f).reverse(),
        _ => Ordering::Equal,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    sort_rank(a)
        .cmp(&sort_rank(b))
        .then_with(|| match (a, b) {
            (Some(Value::Text(a)), Some(Value::Text(b))) => a.cmp(b),
            (Some(a), Some(b)) if sort_rank(Some(a)) == 1 => compare_numbers(a, b),
            _ => Ordering::Equal,
        })
}

/// Stable sort of row positions by the raw value under `key`.
pub fn sort_indices(rows: &[Row], indices: &mut [usize], key: &str, dir: SortDirection) {
    indices.sort_by(|&a, &b| {
        let ord = compare_values(rows[a].get(key), rows[b].get(key));
        match dir {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Filter then sort, returning positions into `rows`.
pub fn view_indices(rows: &[Row], columns: &[Column], state: &ViewState) -> Vec<usize> {
    let mut indices = filter_indices(rows, columns, &state.search);
    if let Some(key) = &state.sort_key {
        sort_indices(rows, &mut indices, key, state.sort_dir);
    }
    trace!(
        "View of {} rows: search {:?}, sort {:?} {:?} -> {} rows",
        rows.len(),
        state.search,
        state.sort_key,
        state.sort_dir,
        indices.len()
    );
    indices
}

pub fn view<'a>(rows: &'a [Row], columns: &[Column], state: &ViewState) -> Vec<&'a Row> {
    view_indices(rows, columns, state)
        .into_iter()
        .map(|idx| &rows[idx])
        .collect()
}

/// How a single value is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Status { text: String, active: bool },
    Monospace(String),
    Plain(String),
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Status { text, .. } | Cell::Monospace(text) | Cell::Plain(text) => text,
        }
    }
}

pub fn present_value(key: &str, value: Option<&Value>) -> Cell {
    match (key, value) {
        (STATUS_KEY, Some(v)) => {
            let text = v.to_string();
            let active = text == ACTIVE_STATUS;
            Cell::Status { text, active }
        }
        (CAPACITY_KEY, Some(v @ (Value::Integer(_) | Value::Number(_)))) => {
            Cell::Monospace(v.to_string())
        }
        (_, Some(v)) => Cell::Plain(v.to_string()),
        (_, None) => Cell::Plain(String::new()),
    }
}

pub fn present(row: &Row, columns: &[Column]) -> Vec<Cell> {
    columns
        .iter()
        .map(|c| present_value(&c.key, row.get(&c.key)))
        .collect()
}

use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::pipeline::SortDirection;
use crate::weights::WeightKey;

#[derive(Debug)]
pub enum TTVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidSortDirection(String),
    UnknownWeight(String),
}

impl fmt::Display for TTVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TTVError::IoError(e) => write!(f, "I/O error: {e}"),
            TTVError::PolarsError(e) => write!(f, "Failed to read table: {e}"),
            TTVError::LoadingFailed(reason) => write!(f, "Loading failed: {reason}"),
            TTVError::FileNotFound => write!(f, "File not found"),
            TTVError::PermissionDenied => write!(f, "Permission denied"),
            TTVError::UnknownFileType => {
                write!(f, "Unknown file type (expected csv, parquet or arrow)")
            }
            TTVError::InvalidSortDirection(s) => {
                write!(f, "Invalid sort direction \"{s}\" (expected asc or desc)")
            }
            TTVError::UnknownWeight(s) => write!(f, "Unknown optimization weight \"{s}\""),
        }
    }
}

impl std::error::Error for TTVError {}

impl From<Error> for TTVError {
    fn from(err: Error) -> Self {
        TTVError::IoError(err)
    }
}

impl From<PolarsError> for TTVError {
    fn from(err: PolarsError) -> Self {
        TTVError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct TTVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    // Applied to every tab that has a sortable column with this key
    #[setters(strip_option)]
    pub initial_sort: Option<(String, SortDirection)>,
    // Slider readings applied in order on startup
    pub weights: Vec<(WeightKey, f64)>,
}

impl Default for TTVConfig {
    fn default() -> Self {
        TTVConfig {
            event_poll_time: 100,
            max_column_width: 40,
            initial_sort: None,
            weights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassLimit {
    Batch,
    Faculty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    ClassLimit(ClassLimit),
}

#[derive(Debug, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextTab,
    PrevTab,
    Search,
    ToggleSort,
    Toggle,
    Edit,
    Delete,
    CopyRow,
    CopyView,
    Constraints,
    Scope,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Tables
  ←↓↑→ / hjkl   move selection
  PgUp / PgDn   move one page
  g / G         first / last row
  Tab / S-Tab   next / previous dataset
  /             search (Enter keeps, Esc clears)
  s             sort current column (again to flip)
  e / d         edit / delete row
  y / Y         copy row / copy view as csv

Panels
  w             constraints and optimization weights
  o             generation scope
  Space, Enter  toggle scope entry
  ← →           adjust constraint
  Enter         type a class limit

  ?             this help
  Esc           close panel
  q             quit";

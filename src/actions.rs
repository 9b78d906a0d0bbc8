//! Per-row capabilities of a listing. A screen asks `supports` before it
//! offers an affordance and only calls `apply` for supported actions.

use std::fmt;

use tracing::info;

use crate::pipeline::{Row, cell_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    Delete,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowAction::Edit => f.write_str("edit"),
            RowAction::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Edited(String),
    Removed,
    Unsupported,
}

pub trait RowActions {
    fn supports(&self, action: RowAction) -> bool;

    fn apply(&mut self, action: RowAction, row: &Row) -> ActionOutcome;

    fn available(&self) -> Vec<RowAction> {
        [RowAction::Edit, RowAction::Delete]
            .into_iter()
            .filter(|a| self.supports(*a))
            .collect()
    }
}

/// Edit and delete for the built-in master data. Nothing is stored, edits
/// only report the row and deletes drop it from the in-memory set.
#[derive(Debug, Clone)]
pub struct MasterDataActions {
    entity: String,
}

impl MasterDataActions {
    pub fn new(entity: impl Into<String>) -> Self {
        MasterDataActions {
            entity: entity.into(),
        }
    }
}

impl RowActions for MasterDataActions {
    fn supports(&self, _action: RowAction) -> bool {
        true
    }

    fn apply(&mut self, action: RowAction, row: &Row) -> ActionOutcome {
        let id = cell_text(row, "id");
        info!("{action} {} {id}", self.entity);
        match action {
            RowAction::Edit => ActionOutcome::Edited(format!("Edit {} {id}", self.entity)),
            RowAction::Delete => ActionOutcome::Removed,
        }
    }
}

/// Tables opened from files are read only.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyActions;

impl RowActions for ReadOnlyActions {
    fn supports(&self, _action: RowAction) -> bool {
        false
    }

    fn apply(&mut self, _action: RowAction, _row: &Row) -> ActionOutcome {
        ActionOutcome::Unsupported
    }
}

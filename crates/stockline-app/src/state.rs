// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ColumnDescriptor, DisplayRow, ErrorInfo, Projection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Errored,
}

impl LoadPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Errored => "error",
        }
    }
}

/// Everything the presentation layer draws. Replaced as a whole on every
/// load or delete cycle, never patched field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct TableViewState {
    pub phase: LoadPhase,
    pub rows: Vec<DisplayRow>,
    pub columns: Vec<ColumnDescriptor>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    pub any_shortfall: bool,
}

impl Default for TableViewState {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Idle,
            rows: Vec::new(),
            columns: Vec::new(),
            is_loading: false,
            error: None,
            any_shortfall: false,
        }
    }
}

impl TableViewState {
    pub fn loading(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            phase: LoadPhase::Loading,
            columns,
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn ready(columns: Vec<ColumnDescriptor>, projection: Projection) -> Self {
        Self {
            phase: LoadPhase::Ready,
            rows: projection.rows,
            columns,
            is_loading: false,
            error: None,
            any_shortfall: projection.any_shortfall,
        }
    }

    pub fn errored(columns: Vec<ColumnDescriptor>, error: ErrorInfo) -> Self {
        Self {
            phase: LoadPhase::Errored,
            rows: Vec::new(),
            columns,
            is_loading: false,
            error: Some(error),
            any_shortfall: false,
        }
    }

    pub fn has_products(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn show_empty_message(&self) -> bool {
        !self.is_loading && self.error.is_none() && !self.has_products()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ErrorInfo::message)
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    DisplayRow, ErrorInfo, ErrorKind, Labels, LineItemId, NavigationRequest, OpportunityId,
    PageAction, ProfileInfo, RawLineItem, Role, RowAction, RowActionName, TableViewState,
    build_columns, project_rows,
};

/// The record service, delete service, role service and navigation the
/// controller talks to. Calls are made one at a time.
pub trait TableRuntime {
    fn current_profile_info(&mut self) -> Result<Option<ProfileInfo>>;
    fn opportunity_products(
        &mut self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Vec<RawLineItem>>>;
    fn delete_opportunity_line(&mut self, line_item_id: &LineItemId) -> Result<()>;
    fn navigate(&mut self, request: &NavigationRequest) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Deleted(LineItemId),
    Navigated(NavigationRequest),
    Ignored,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TableController {
    opportunity_id: OpportunityId,
    labels: Labels,
    role: Option<Role>,
    state: TableViewState,
}

impl TableController {
    pub fn new(opportunity_id: OpportunityId, labels: Labels) -> Self {
        Self {
            opportunity_id,
            labels,
            role: None,
            state: TableViewState::default(),
        }
    }

    pub fn state(&self) -> &TableViewState {
        &self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn opportunity_id(&self) -> &OpportunityId {
        &self.opportunity_id
    }

    /// Resolves the role, builds the columns once, then loads the rows.
    pub fn mount<R: TableRuntime>(&mut self, runtime: &mut R) {
        self.state = TableViewState::loading(Vec::new());

        let profile = match runtime.current_profile_info() {
            Ok(profile) => profile,
            Err(error) => {
                warn!(opportunity = %self.opportunity_id, "role resolution failed: {error:#}");
                self.role = None;
                self.state = TableViewState::errored(
                    Vec::new(),
                    ErrorInfo::from_error(ErrorKind::RoleResolution, &error),
                );
                return;
            }
        };

        let role = Role::resolve(profile.as_ref());
        debug!(role = role.as_str(), "resolved role");
        self.role = Some(role);
        let columns = build_columns(role, &self.labels);
        self.state = TableViewState::loading(columns);
        self.load_products(runtime);
    }

    /// Fetches and re-projects every row. Retries the whole mount when the
    /// role was never resolved.
    pub fn reload<R: TableRuntime>(&mut self, runtime: &mut R) {
        if self.role.is_none() {
            self.mount(runtime);
            return;
        }

        let columns = std::mem::take(&mut self.state.columns);
        self.state = TableViewState::loading(columns);
        self.load_products(runtime);
    }

    fn load_products<R: TableRuntime>(&mut self, runtime: &mut R) {
        let columns = std::mem::take(&mut self.state.columns);
        self.state = match runtime.opportunity_products(&self.opportunity_id) {
            Ok(raw) => {
                let projection = project_rows(raw.as_deref());
                info!(
                    opportunity = %self.opportunity_id,
                    rows = projection.rows.len(),
                    shortfall = projection.any_shortfall,
                    "loaded opportunity products"
                );
                TableViewState::ready(columns, projection)
            }
            Err(error) => {
                warn!(opportunity = %self.opportunity_id, "row fetch failed: {error:#}");
                TableViewState::errored(
                    columns,
                    ErrorInfo::from_error(ErrorKind::RowFetch, &error),
                )
            }
        };
    }

    pub fn dispatch<R: TableRuntime>(
        &mut self,
        runtime: &mut R,
        action: &RowAction,
    ) -> ActionOutcome {
        match action.name {
            RowActionName::Delete => self.handle_delete(runtime, &action.row),
            RowActionName::View => self.handle_view(runtime, &action.row),
        }
    }

    /// Unknown action names are ignored.
    pub fn dispatch_named<R: TableRuntime>(
        &mut self,
        runtime: &mut R,
        action_name: &str,
        row: &DisplayRow,
    ) -> ActionOutcome {
        match RowActionName::parse(action_name) {
            Some(name) => self.dispatch(
                runtime,
                &RowAction {
                    name,
                    row: row.clone(),
                },
            ),
            None => {
                debug!(action = action_name, "ignoring unknown row action");
                ActionOutcome::Ignored
            }
        }
    }

    /// Deletes the line, then reloads everything from the service rather
    /// than dropping the row locally.
    pub fn handle_delete<R: TableRuntime>(
        &mut self,
        runtime: &mut R,
        row: &DisplayRow,
    ) -> ActionOutcome {
        if self.state.is_loading {
            warn!(line_item = %row.line_item_id, "delete refused while loading");
            return ActionOutcome::Ignored;
        }

        let columns = std::mem::take(&mut self.state.columns);
        self.state = TableViewState::loading(columns);

        if let Err(error) = runtime.delete_opportunity_line(&row.line_item_id) {
            warn!(line_item = %row.line_item_id, "delete failed: {error:#}");
            let columns = std::mem::take(&mut self.state.columns);
            self.state =
                TableViewState::errored(columns, ErrorInfo::from_error(ErrorKind::Delete, &error));
            return ActionOutcome::Failed;
        }

        info!(line_item = %row.line_item_id, "deleted opportunity line");
        self.load_products(runtime);
        ActionOutcome::Deleted(row.line_item_id.clone())
    }

    pub fn handle_view<R: TableRuntime>(
        &mut self,
        runtime: &mut R,
        row: &DisplayRow,
    ) -> ActionOutcome {
        let Some(product_id) = row.product_id.as_ref().filter(|id| !id.is_blank()) else {
            return ActionOutcome::Ignored;
        };

        let request = NavigationRequest {
            record_id: product_id.clone(),
            action: PageAction::View,
        };
        if let Err(error) = runtime.navigate(&request) {
            warn!(product = %product_id, "navigation failed: {error:#}");
            return ActionOutcome::Failed;
        }
        ActionOutcome::Navigated(request)
    }
}

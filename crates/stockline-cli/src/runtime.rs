// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::{Config, RECORD_ID_PLACEHOLDER};
use anyhow::{Context, Result, bail};
use std::process::{Command, Stdio};
use stockline_app::{
    LineItemId, NavigationRequest, OpportunityId, ProfileInfo, RawLineItem, TableRuntime,
};
use stockline_client::Client;
use stockline_db::Store;
use tracing::info;

/// Turns a navigation request into a record URL and optionally hands it to
/// an opener program.
#[derive(Debug, Clone)]
pub struct Navigator {
    record_url: String,
    open_command: Option<String>,
}

impl Navigator {
    pub fn new(record_url: &str, open_command: Option<&str>) -> Self {
        Self {
            record_url: record_url.to_owned(),
            open_command: open_command
                .map(str::trim)
                .filter(|command| !command.is_empty())
                .map(str::to_owned),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.record_url(), config.open_command())
    }

    pub fn url_for(&self, request: &NavigationRequest) -> String {
        self.record_url
            .replace(RECORD_ID_PLACEHOLDER, request.record_id.as_str())
            .replace("{action}", request.action.as_str())
    }

    pub fn open(&self, request: &NavigationRequest) -> Result<()> {
        if request.record_id.is_blank() {
            bail!("navigation request has no record id");
        }
        let url = self.url_for(request);
        info!(
            record_id = %request.record_id,
            action = request.action.as_str(),
            url = %url,
            "navigate to record page"
        );

        let Some(command) = &self.open_command else {
            return Ok(());
        };

        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(());
        };
        // Blocks until the opener exits; xdg-open and open hand off and return.
        let status = Command::new(program)
            .args(parts)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("run navigation.open_command {program:?} for {url}"))?;
        if !status.success() {
            bail!("navigation.open_command {program:?} failed for {url}: {status}");
        }
        Ok(())
    }
}

/// Serves the table from the local database.
pub struct StoreRuntime<'a> {
    store: &'a Store,
    navigator: Navigator,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store, navigator: Navigator) -> Self {
        Self { store, navigator }
    }
}

impl TableRuntime for StoreRuntime<'_> {
    fn current_profile_info(&mut self) -> Result<Option<ProfileInfo>> {
        self.store.current_profile_info()
    }

    fn opportunity_products(
        &mut self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Vec<RawLineItem>>> {
        if self.store.get_opportunity(opportunity_id)?.is_none() {
            bail!("opportunity {opportunity_id} not found");
        }
        self.store.list_opportunity_products(opportunity_id).map(Some)
    }

    fn delete_opportunity_line(&mut self, line_item_id: &LineItemId) -> Result<()> {
        self.store.delete_opportunity_line(line_item_id)
    }

    fn navigate(&mut self, request: &NavigationRequest) -> Result<()> {
        self.navigator.open(request)
    }
}

/// Serves the table from a remote record service.
pub struct HttpRuntime {
    client: Client,
    navigator: Navigator,
}

impl HttpRuntime {
    pub fn new(client: Client, navigator: Navigator) -> Self {
        Self { client, navigator }
    }
}

impl TableRuntime for HttpRuntime {
    fn current_profile_info(&mut self) -> Result<Option<ProfileInfo>> {
        self.client.current_profile_info()
    }

    fn opportunity_products(
        &mut self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Vec<RawLineItem>>> {
        self.client.opportunity_products(opportunity_id)
    }

    fn delete_opportunity_line(&mut self, line_item_id: &LineItemId) -> Result<()> {
        self.client.delete_opportunity_line(line_item_id)
    }

    fn navigate(&mut self, request: &NavigationRequest) -> Result<()> {
        self.navigator.open(request)
    }
}

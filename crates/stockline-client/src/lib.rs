// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use stockline_app::{LineItemId, OpportunityId, ProfileInfo, RawLineItem, ServiceFault};
use tracing::debug;
use url::Url;

/// Blocking client for a remote record service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("service.base_url must not be empty");
        }
        let parsed = Url::parse(trimmed)
            .with_context(|| format!("service.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "service.base_url {trimmed:?} must use http or https, got {}://",
                parsed.scheme()
            );
        }
        if parsed.cannot_be_a_base() {
            bail!("service.base_url {trimmed:?} cannot carry a path");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url: parsed,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn current_profile_info(&self) -> Result<Option<ProfileInfo>> {
        let url = self.endpoint(&["profile"])?;
        let response = self.send(self.http.get(url))?;
        decode_optional(response).context("decode profile")
    }

    pub fn opportunity_products(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Vec<RawLineItem>>> {
        let url = self.endpoint(&["opportunities", opportunity_id.as_str(), "products"])?;
        let response = self.send(self.http.get(url))?;
        decode_optional(response)
            .with_context(|| format!("decode products for opportunity {opportunity_id}"))
    }

    pub fn delete_opportunity_line(&self, line_item_id: &LineItemId) -> Result<()> {
        let url = self.endpoint(&["line-items", line_item_id.as_str()])?;
        self.send(self.http.delete(url))?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("service.base_url {} cannot carry a path", self.base_url()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "record service responded");
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

/// An empty body or a literal `null` both decode to `None`.
fn decode_optional<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let body = response.text().context("read response body")?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<T>>(&body).context("parse response JSON")
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach record service at {} -- check [service].base_url ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let payload = match serde_json::from_str::<Value>(body) {
        Ok(parsed) if !parsed.is_null() => parsed,
        _ if body.trim().is_empty() => Value::String(
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned(),
        ),
        _ => Value::String(body.trim().to_owned()),
    };
    ServiceFault::new(Some(status.as_u16()), payload).into()
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::PathBuf;
use stockline_app::{
    LineItemId, NavigationRequest, OpportunityId, ProductId, ProfileInfo, RawLineItem,
    ServiceFault, TableRuntime,
};

const PRODUCT_FAMILIES: [&str; 8] = [
    "Drill",
    "Saw",
    "Sander",
    "Router",
    "Grinder",
    "Planer",
    "Compressor",
    "Generator",
];

const PRODUCT_ADJECTIVES: [&str; 12] = [
    "Cordless",
    "Compact",
    "Heavy Duty",
    "Brushless",
    "Industrial",
    "Portable",
    "Precision",
    "Rugged",
    "Variable Speed",
    "Pro",
    "Quiet",
    "Dual Voltage",
];

const PRODUCT_SERIES: [&str; 6] = ["X1", "X2", "S", "Max", "Lite", "Plus"];

const ACCOUNT_NAMES: [&str; 10] = [
    "Harbor Supply",
    "Northwind Builders",
    "Summit Rentals",
    "Greenleaf Works",
    "Apex Fabrication",
    "Cedar Ridge Homes",
    "Brookside Hardware",
    "Hartley & Sons",
    "Canyon Contracting",
    "Lakeview Facilities",
];

const DEAL_KINDS: [&str; 5] = ["Renewal", "Fleet Refresh", "Expansion", "Pilot", "Replacement"];

#[derive(Debug, Clone, PartialEq)]
pub struct FakeProduct {
    pub name: String,
    pub family: String,
    pub unit_price: f64,
    pub quantity_in_stock: f64,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for products, opportunities and line items.
#[derive(Debug, Clone)]
pub struct OpportunityFaker {
    rng: DeterministicRng,
    seed: u64,
    next_line: u64,
}

impl OpportunityFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            next_line: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn product(&mut self) -> FakeProduct {
        let family = self.pick(&PRODUCT_FAMILIES);
        let name = format!(
            "{} {} {}",
            self.pick(&PRODUCT_ADJECTIVES),
            family,
            self.pick(&PRODUCT_SERIES)
        );
        // Whole cents keep the sums exact enough for assertions.
        let unit_price = self.int_range(1_500, 250_000) as f64 / 100.0;
        FakeProduct {
            name,
            family: family.to_owned(),
            unit_price,
            quantity_in_stock: self.int_range(0, 40) as f64,
        }
    }

    pub fn opportunity_name(&mut self) -> String {
        format!("{} {}", self.pick(&ACCOUNT_NAMES), self.pick(&DEAL_KINDS))
    }

    pub fn quantity(&mut self) -> f64 {
        self.int_range(1, 25) as f64
    }

    /// A raw line with a fresh line id for `product`.
    pub fn line_item(&mut self, product_id: &ProductId, product: &FakeProduct) -> RawLineItem {
        self.next_line += 1;
        let quantity = self.quantity();
        RawLineItem {
            line_item_id: LineItemId::new(format!("00k{:015}", self.next_line)),
            product_id: Some(product_id.clone()),
            product_name: product.name.clone(),
            quantity: Some(quantity),
            unit_price: Some(product.unit_price),
            total_price: Some(product.unit_price * quantity),
            quantity_in_stock: Some(product.quantity_in_stock),
        }
    }

    pub fn line_items(&mut self, count: usize) -> Vec<RawLineItem> {
        (0..count)
            .map(|index| {
                let product = self.product();
                let product_id = ProductId::new(format!("01t{:015}", index + 1));
                self.line_item(&product_id, &product)
            })
            .collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Profile,
    Products(OpportunityId),
    Delete(LineItemId),
    Navigate(NavigationRequest),
}

/// In-memory collaborators with switchable failures. Deleting a line
/// removes it from `lines`, so the next fetch sees the change.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRuntime {
    pub profile: Option<ProfileInfo>,
    pub lines: Option<Vec<RawLineItem>>,
    pub profile_failure: Option<String>,
    pub fetch_failure: Option<Value>,
    pub delete_failure: Option<Value>,
    pub navigation_failure: Option<String>,
    pub calls: Vec<RuntimeCall>,
}

impl ScriptedRuntime {
    pub fn with_lines(profile: Option<ProfileInfo>, lines: Vec<RawLineItem>) -> Self {
        Self {
            profile,
            lines: Some(lines),
            ..Self::default()
        }
    }

    pub fn admin() -> ProfileInfo {
        ProfileInfo {
            is_system_admin: true,
            is_commercial: false,
        }
    }

    pub fn commercial() -> ProfileInfo {
        ProfileInfo {
            is_system_admin: false,
            is_commercial: true,
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RuntimeCall::Products(_)))
            .count()
    }

    pub fn navigations(&self) -> Vec<&NavigationRequest> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Navigate(request) => Some(request),
                _ => None,
            })
            .collect()
    }
}

impl TableRuntime for ScriptedRuntime {
    fn current_profile_info(&mut self) -> Result<Option<ProfileInfo>> {
        self.calls.push(RuntimeCall::Profile);
        if let Some(message) = &self.profile_failure {
            return Err(anyhow!("{message}"));
        }
        Ok(self.profile)
    }

    fn opportunity_products(
        &mut self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Vec<RawLineItem>>> {
        self.calls.push(RuntimeCall::Products(opportunity_id.clone()));
        if let Some(payload) = &self.fetch_failure {
            return Err(ServiceFault::new(Some(500), payload.clone()).into());
        }
        Ok(self.lines.clone())
    }

    fn delete_opportunity_line(&mut self, line_item_id: &LineItemId) -> Result<()> {
        self.calls.push(RuntimeCall::Delete(line_item_id.clone()));
        if let Some(payload) = &self.delete_failure {
            return Err(ServiceFault::new(Some(400), payload.clone()).into());
        }
        if let Some(lines) = &mut self.lines {
            lines.retain(|line| &line.line_item_id != line_item_id);
        }
        Ok(())
    }

    fn navigate(&mut self, request: &NavigationRequest) -> Result<()> {
        self.calls.push(RuntimeCall::Navigate(request.clone()));
        if let Some(message) = &self.navigation_failure {
            return Err(anyhow!("{message}"));
        }
        Ok(())
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("stockline.db");
    Ok((dir, db_path))
}

pub fn product_families() -> &'static [&'static str] {
    &PRODUCT_FAMILIES
}

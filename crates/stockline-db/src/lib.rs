// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod validation;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use stockline_app::{LineItemId, OpportunityId, ProductId, ProfileInfo, RawLineItem};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "stockline";
pub const SESSION_PROFILE_KEY: &str = "session.profile";

pub const OPPORTUNITY_ID_PREFIX: &str = "006";
pub const PRODUCT_ID_PREFIX: &str = "01t";
pub const LINE_ITEM_ID_PREFIX: &str = "00k";

const ID_DIGITS: usize = 15;

const DEFAULT_PROFILES: [(&str, bool, bool); 3] = [
    ("System Administrator", true, false),
    ("Commercial", false, true),
    ("Standard User", false, false),
];

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "profiles",
        &["name", "is_system_admin", "is_commercial", "created_at"],
    ),
    (
        "opportunities",
        &["id", "name", "account_name", "created_at", "updated_at"],
    ),
    (
        "products",
        &[
            "id",
            "name",
            "family",
            "unit_price",
            "quantity_in_stock",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "opportunity_line_items",
        &[
            "id",
            "opportunity_id",
            "product_id",
            "quantity",
            "unit_price",
            "total_price",
            "created_at",
            "updated_at",
        ],
    ),
    ("settings", &["key", "value", "updated_at"]),
    ("id_sequences", &["name", "last_value"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_line_items_opportunity_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_line_items_opportunity_id ON opportunity_line_items (opportunity_id);",
    },
    RequiredIndex {
        name: "idx_line_items_product_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_line_items_product_id ON opportunity_line_items (product_id);",
    },
    RequiredIndex {
        name: "idx_products_name",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_products_name ON products (name);",
    },
];

// (name, family, unit price, stock)
const DEMO_PRODUCTS: [(&str, &str, f64, f64); 5] = [
    ("Brushless Drill X2", "Drill", 189.0, 12.0),
    ("Compact Circular Saw", "Saw", 149.5, 3.0),
    ("Random Orbit Sander", "Sander", 79.99, 0.0),
    ("Heavy Duty Grinder Max", "Grinder", 129.0, 40.0),
    ("Portable Generator 3kW", "Generator", 899.0, 2.0),
];

// (product index, quantity)
const DEMO_LINES: [(usize, f64); 4] = [(0, 4.0), (1, 5.0), (3, 10.0), (4, 2.0)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub info: ProfileInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub name: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub family: String,
    pub unit_price: Option<f64>,
    pub quantity_in_stock: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOpportunity {
    pub name: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewProduct {
    pub name: String,
    pub family: String,
    pub unit_price: Option<f64>,
    pub quantity_in_stock: Option<f64>,
}

/// A line to add. A missing unit price falls back to the product's list
/// price; the total is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub opportunity_id: OpportunityId,
    pub product_id: ProductId,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;

        self.seed_defaults()?;
        Ok(())
    }

    pub fn seed_defaults(&self) -> Result<()> {
        let now = now_rfc3339()?;
        for (name, is_system_admin, is_commercial) in DEFAULT_PROFILES {
            self.conn
                .execute(
                    "
                    INSERT OR IGNORE INTO profiles (name, is_system_admin, is_commercial, created_at)
                    VALUES (?, ?, ?, ?)
                    ",
                    params![name, is_system_admin, is_commercial, now],
                )
                .with_context(|| format!("insert default profile {name}"))?;
        }
        Ok(())
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT name, is_system_admin, is_commercial
                FROM profiles
                ORDER BY name ASC
                ",
            )
            .context("prepare profiles query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProfileRecord {
                    name: row.get(0)?,
                    info: ProfileInfo {
                        is_system_admin: row.get(1)?,
                        is_commercial: row.get(2)?,
                    },
                })
            })
            .context("query profiles")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect profiles")
    }

    pub fn profile_info(&self, name: &str) -> Result<Option<ProfileInfo>> {
        self.conn
            .query_row(
                "SELECT is_system_admin, is_commercial FROM profiles WHERE name = ?",
                params![name],
                |row| {
                    Ok(ProfileInfo {
                        is_system_admin: row.get(0)?,
                        is_commercial: row.get(1)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load profile {name}"))
    }

    pub fn session_profile(&self) -> Result<Option<String>> {
        self.get_setting_raw(SESSION_PROFILE_KEY)
    }

    pub fn set_session_profile(&self, name: &str) -> Result<()> {
        if self.profile_info(name)?.is_none() {
            let known = self
                .list_profiles()?
                .into_iter()
                .map(|profile| profile.name)
                .collect::<Vec<_>>();
            bail!(
                "unknown profile `{name}`; choose one of: {}",
                known.join(", ")
            );
        }
        self.put_setting_raw(SESSION_PROFILE_KEY, name)
    }

    /// Profile of the session user. No session profile means no profile.
    pub fn current_profile_info(&self) -> Result<Option<ProfileInfo>> {
        let Some(name) = self.session_profile()? else {
            return Ok(None);
        };
        let info = self.profile_info(&name)?.ok_or_else(|| {
            anyhow!(
                "session profile `{name}` no longer exists; pass --profile with a known profile"
            )
        })?;
        Ok(Some(info))
    }

    pub fn create_opportunity(&self, opportunity: &NewOpportunity) -> Result<OpportunityId> {
        let name = validation::check_name(&opportunity.name)
            .map_err(|error| anyhow!("opportunity {error}"))?;
        let id = OpportunityId::new(self.next_id("opportunities", OPPORTUNITY_ID_PREFIX)?);
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO opportunities (id, name, account_name, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![id.as_str(), name, opportunity.account_name.trim(), now, now],
            )
            .context("insert opportunity")?;
        Ok(id)
    }

    pub fn get_opportunity(&self, opportunity_id: &OpportunityId) -> Result<Option<Opportunity>> {
        self.conn
            .query_row(
                "SELECT id, name, account_name FROM opportunities WHERE id = ?",
                params![opportunity_id.as_str()],
                |row| {
                    Ok(Opportunity {
                        id: OpportunityId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                        account_name: row.get(2)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load opportunity {opportunity_id}"))
    }

    pub fn list_opportunities(&self) -> Result<Vec<Opportunity>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, name, account_name
                FROM opportunities
                ORDER BY created_at DESC, id DESC
                ",
            )
            .context("prepare opportunities query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Opportunity {
                    id: OpportunityId::new(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    account_name: row.get(2)?,
                })
            })
            .context("query opportunities")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect opportunities")
    }

    pub fn create_product(&self, product: &NewProduct) -> Result<ProductId> {
        let name =
            validation::check_name(&product.name).map_err(|error| anyhow!("product {error}"))?;
        let unit_price = validation::check_price(product.unit_price)
            .map_err(|error| anyhow!("product `{name}`: {error}"))?;
        let stock = validation::check_stock(product.quantity_in_stock)
            .map_err(|error| anyhow!("product `{name}`: {error}"))?;

        let id = ProductId::new(self.next_id("products", PRODUCT_ID_PREFIX)?);
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO products (
                  id, name, family, unit_price, quantity_in_stock, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    id.as_str(),
                    name,
                    product.family.trim(),
                    unit_price,
                    stock,
                    now,
                    now
                ],
            )
            .context("insert product")?;
        Ok(id)
    }

    pub fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.conn
            .query_row(
                "
                SELECT id, name, family, unit_price, quantity_in_stock
                FROM products
                WHERE id = ?
                ",
                params![product_id.as_str()],
                |row| {
                    Ok(Product {
                        id: ProductId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                        family: row.get(2)?,
                        unit_price: row.get(3)?,
                        quantity_in_stock: row.get(4)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load product {product_id}"))
    }

    pub fn set_product_stock(&self, product_id: &ProductId, stock: Option<f64>) -> Result<()> {
        let stock = validation::check_stock(stock)
            .map_err(|error| anyhow!("product {product_id}: {error}"))?;
        let now = now_rfc3339()?;
        let changed = self
            .conn
            .execute(
                "UPDATE products SET quantity_in_stock = ?, updated_at = ? WHERE id = ?",
                params![stock, now, product_id.as_str()],
            )
            .with_context(|| format!("update stock for product {product_id}"))?;
        if changed == 0 {
            bail!("product {product_id} no longer exists");
        }
        Ok(())
    }

    pub fn add_line_item(&self, line: &NewLineItem) -> Result<LineItemId> {
        if self.get_opportunity(&line.opportunity_id)?.is_none() {
            bail!("opportunity {} no longer exists", line.opportunity_id);
        }
        let product = self
            .get_product(&line.product_id)?
            .ok_or_else(|| anyhow!("product {} no longer exists", line.product_id))?;

        let quantity = validation::check_quantity(line.quantity)
            .map_err(|error| anyhow!("line for `{}`: {error}", product.name))?;
        let unit_price = validation::check_price(line.unit_price.or(product.unit_price))
            .map_err(|error| anyhow!("line for `{}`: {error}", product.name))?;
        let total_price = validation::line_total(quantity, unit_price);

        let id = LineItemId::new(self.next_id("opportunity_line_items", LINE_ITEM_ID_PREFIX)?);
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO opportunity_line_items (
                  id, opportunity_id, product_id, quantity, unit_price, total_price,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    id.as_str(),
                    line.opportunity_id.as_str(),
                    line.product_id.as_str(),
                    quantity,
                    unit_price,
                    total_price,
                    now,
                    now
                ],
            )
            .context("insert opportunity line item")?;
        debug!(line_item = %id, opportunity = %line.opportunity_id, "added line item");
        Ok(id)
    }

    /// Line items of an opportunity joined with each product's current stock.
    pub fn list_opportunity_products(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<RawLineItem>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  li.id,
                  li.product_id,
                  COALESCE(p.name, ''),
                  li.quantity,
                  li.unit_price,
                  li.total_price,
                  p.quantity_in_stock
                FROM opportunity_line_items li
                LEFT JOIN products p ON p.id = li.product_id
                WHERE li.opportunity_id = ?
                ORDER BY COALESCE(p.name, '') COLLATE NOCASE ASC, li.id ASC
                ",
            )
            .context("prepare opportunity products query")?;
        let rows = stmt
            .query_map(params![opportunity_id.as_str()], |row| {
                Ok(RawLineItem {
                    line_item_id: LineItemId::new(row.get::<_, String>(0)?),
                    product_id: row.get::<_, Option<String>>(1)?.map(ProductId::new),
                    product_name: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_price: row.get(4)?,
                    total_price: row.get(5)?,
                    quantity_in_stock: row.get(6)?,
                })
            })
            .context("query opportunity products")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect products for opportunity {opportunity_id}"))
    }

    pub fn delete_opportunity_line(&self, line_item_id: &LineItemId) -> Result<()> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM opportunity_line_items WHERE id = ?",
                params![line_item_id.as_str()],
            )
            .with_context(|| format!("delete line item {line_item_id}"))?;
        if deleted == 0 {
            bail!("line item {line_item_id} no longer exists; reload to refresh the table");
        }
        info!(line_item = %line_item_id, "deleted line item");
        Ok(())
    }

    /// Seeds a small catalog and one opportunity where at least one line
    /// asks for more than is in stock.
    pub fn seed_demo_data(&self) -> Result<OpportunityId> {
        let mut product_ids = Vec::with_capacity(DEMO_PRODUCTS.len());
        for (name, family, unit_price, stock) in DEMO_PRODUCTS {
            let id = self.create_product(&NewProduct {
                name: name.to_owned(),
                family: family.to_owned(),
                unit_price: Some(unit_price),
                quantity_in_stock: Some(stock),
            })?;
            product_ids.push(id);
        }

        let opportunity_id = self.create_opportunity(&NewOpportunity {
            name: "Harbor Supply Fleet Refresh".to_owned(),
            account_name: "Harbor Supply".to_owned(),
        })?;
        for (product_index, quantity) in DEMO_LINES {
            let product_id = product_ids
                .get(product_index)
                .ok_or_else(|| anyhow!("demo line references missing product {product_index}"))?;
            self.add_line_item(&NewLineItem {
                opportunity_id: opportunity_id.clone(),
                product_id: product_id.clone(),
                quantity: Some(quantity),
                unit_price: None,
            })?;
        }

        if self.session_profile()?.is_none() {
            self.set_session_profile(DEFAULT_PROFILES[0].0)?;
        }
        info!(opportunity = %opportunity_id, "seeded demo data");
        Ok(opportunity_id)
    }

    /// Record ids are never reissued, even after the newest row is deleted.
    /// A missing counter starts after the highest rowid already in the table.
    fn next_id(&self, table: &str, prefix: &str) -> Result<String> {
        let next: i64 = self
            .conn
            .query_row(
                &format!(
                    "
                    INSERT INTO id_sequences (name, last_value)
                    VALUES (?, (SELECT COALESCE(MAX(rowid), 0) FROM {table}) + 1)
                    ON CONFLICT (name) DO UPDATE SET last_value = last_value + 1
                    RETURNING last_value
                    "
                ),
                params![table],
                |row| row.get(0),
            )
            .with_context(|| format!("allocate id for {table}"))?;
        Ok(format_record_id(prefix, next))
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }
}

pub fn format_record_id(prefix: &str, sequence: i64) -> String {
    format!("{prefix}{sequence:0width$}", width = ID_DIGITS)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("STOCKLINE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set STOCKLINE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("stockline.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a stockline database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

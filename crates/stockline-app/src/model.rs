// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

/// Style token applied to the quantity and remaining-stock cells of a row
/// whose remaining stock is negative.
pub const SHORTFALL_STYLE_CLASS: &str = "slds-text-color_error slds-text-title_bold";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Commercial,
    Other,
}

impl Role {
    /// Admin wins when both flags are set; a missing profile is `Other`.
    pub fn resolve(profile: Option<&ProfileInfo>) -> Self {
        match profile {
            Some(profile) if profile.is_system_admin => Self::Admin,
            Some(profile) if profile.is_commercial => Self::Commercial,
            _ => Self::Other,
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Commercial => "commercial",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    #[serde(default)]
    pub is_system_admin: bool,
    #[serde(default)]
    pub is_commercial: bool,
}

/// A line item as returned by the record service. Quantities may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub line_item_id: LineItemId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub quantity_in_stock: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub line_item_id: LineItemId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    pub quantity_in_stock: f64,
    pub remaining_stock: f64,
    pub shortfall: bool,
    pub row_style_class: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Currency(Option<f64>),
}

impl DisplayRow {
    pub fn cell(&self, field: ColumnField) -> CellValue {
        match field {
            ColumnField::ProductName => CellValue::Text(self.product_name.clone()),
            ColumnField::Quantity => CellValue::Number(self.quantity),
            ColumnField::UnitPrice => CellValue::Currency(self.unit_price),
            ColumnField::TotalPrice => CellValue::Currency(self.total_price),
            ColumnField::RemainingStock => CellValue::Number(self.remaining_stock),
        }
    }

    pub fn cell_class(&self, column: &ColumnDescriptor) -> &str {
        if column.styled {
            &self.row_style_class
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnField {
    ProductName,
    Quantity,
    UnitPrice,
    TotalPrice,
    RemainingStock,
}

impl ColumnField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductName => "productName",
            Self::Quantity => "quantity",
            Self::UnitPrice => "unitPrice",
            Self::TotalPrice => "totalPrice",
            Self::RemainingStock => "remainingStock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Number,
    Currency,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowActionName {
    Delete,
    View,
}

impl RowActionName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::View => "view",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delete" => Some(Self::Delete),
            "view" => Some(Self::View),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub label: String,
    pub field: Option<ColumnField>,
    pub kind: ColumnKind,
    pub width_hint: Option<u16>,
    pub action: Option<RowActionName>,
    /// Cells in this column take the row's style class.
    pub styled: bool,
}

impl ColumnDescriptor {
    pub fn field_name(&self) -> Option<&'static str> {
        self.field.map(ColumnField::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowAction {
    pub name: RowActionName,
    pub row: DisplayRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageAction {
    View,
}

impl PageAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
        }
    }
}

/// Request to open the standard record page of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub record_id: ProductId,
    pub action: PageAction,
}

/// User-visible text. Every entry can be overridden from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub opportunity_products: String,
    pub product_name: String,
    pub quantity: String,
    pub unit_price: String,
    pub total_price: String,
    pub quantity_in_stock: String,
    pub delete: String,
    pub view_product: String,
    pub stock_warning_line1: String,
    pub stock_warning_line2: String,
    pub no_products_line1: String,
    pub no_products_line2: String,
    pub no_products_line3: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            opportunity_products: "Opportunity Products".to_owned(),
            product_name: "Product Name".to_owned(),
            quantity: "Quantity".to_owned(),
            unit_price: "Unit Price".to_owned(),
            total_price: "Total Price".to_owned(),
            quantity_in_stock: "Quantity In Stock".to_owned(),
            delete: "Delete".to_owned(),
            view_product: "View Product".to_owned(),
            stock_warning_line1: "Some products have insufficient stock.".to_owned(),
            stock_warning_line2: "Adjust the quantities or contact your administrator."
                .to_owned(),
            no_products_line1: "No products on this opportunity yet.".to_owned(),
            no_products_line2: "Add products from the price book to get started.".to_owned(),
            no_products_line3: "Stock levels are checked as soon as lines are added.".to_owned(),
        }
    }
}

impl Labels {
    pub fn stock_warning(&self) -> [&str; 2] {
        [&self.stock_warning_line1, &self.stock_warning_line2]
    }

    pub fn no_products(&self) -> [&str; 3] {
        [
            &self.no_products_line1,
            &self.no_products_line2,
            &self.no_products_line3,
        ]
    }
}

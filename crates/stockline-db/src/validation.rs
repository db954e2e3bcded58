// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    InvalidQuantity,
    InvalidStock,
    InvalidPrice,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => f.write_str("name must not be empty"),
            Self::InvalidQuantity => f.write_str("quantity must be a positive number"),
            Self::InvalidStock => f.write_str("stock must be zero or a positive number"),
            Self::InvalidPrice => f.write_str("price must be zero or a positive number"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn check_name(name: &str) -> ValidationResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed)
}

pub fn check_quantity(quantity: Option<f64>) -> ValidationResult<Option<f64>> {
    match quantity {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(ValidationError::InvalidQuantity),
        other => Ok(other),
    }
}

pub fn check_stock(stock: Option<f64>) -> ValidationResult<Option<f64>> {
    match stock {
        Some(value) if !value.is_finite() || value < 0.0 => Err(ValidationError::InvalidStock),
        other => Ok(other),
    }
}

pub fn check_price(price: Option<f64>) -> ValidationResult<Option<f64>> {
    match price {
        Some(value) if !value.is_finite() || value < 0.0 => Err(ValidationError::InvalidPrice),
        other => Ok(other),
    }
}

/// Quantity times unit price, or `None` when either is unknown.
pub fn line_total(quantity: Option<f64>, unit_price: Option<f64>) -> Option<f64> {
    Some(quantity? * unit_price?)
}

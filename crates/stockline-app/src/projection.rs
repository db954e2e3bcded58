// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{DisplayRow, RawLineItem, SHORTFALL_STYLE_CLASS};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub rows: Vec<DisplayRow>,
    pub any_shortfall: bool,
}

/// Derives display rows from raw line items. `None` and an empty slice
/// both project to no rows.
pub fn project_rows(raw: Option<&[RawLineItem]>) -> Projection {
    let Some(raw) = raw else {
        return Projection::default();
    };

    let rows = raw.iter().map(project_row).collect::<Vec<_>>();
    let any_shortfall = rows.iter().any(|row| row.shortfall);
    Projection {
        rows,
        any_shortfall,
    }
}

pub fn project_row(raw: &RawLineItem) -> DisplayRow {
    // Absent counts as zero; a real zero stays zero.
    let quantity = raw.quantity.unwrap_or(0.0);
    let quantity_in_stock = raw.quantity_in_stock.unwrap_or(0.0);
    let remaining_stock = quantity_in_stock - quantity;
    let shortfall = remaining_stock < 0.0;

    DisplayRow {
        line_item_id: raw.line_item_id.clone(),
        product_id: raw.product_id.clone(),
        product_name: raw.product_name.clone(),
        quantity,
        unit_price: raw.unit_price,
        total_price: raw.total_price,
        quantity_in_stock,
        remaining_stock,
        shortfall,
        row_style_class: if shortfall {
            SHORTFALL_STYLE_CLASS.to_owned()
        } else {
            String::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{project_row, project_rows};
    use crate::{
        ColumnField, LineItemId, ProductId, RawLineItem, Role, SHORTFALL_STYLE_CLASS,
        build_columns, Labels,
    };

    fn line(id: &str, quantity: Option<f64>, stock: Option<f64>) -> RawLineItem {
        RawLineItem {
            line_item_id: LineItemId::new(id),
            product_id: Some(ProductId::new(format!("01t{id}"))),
            product_name: format!("Product {id}"),
            quantity,
            unit_price: Some(10.0),
            total_price: quantity.map(|q| q * 10.0),
            quantity_in_stock: stock,
        }
    }

    #[test]
    fn shortfall_row_is_flagged_and_styled() {
        let projection = project_rows(Some(&[line("1", Some(5.0), Some(3.0))]));
        assert!(projection.any_shortfall);

        let row = &projection.rows[0];
        assert_eq!(row.remaining_stock, -2.0);
        assert!(row.shortfall);
        assert_eq!(row.row_style_class, SHORTFALL_STYLE_CLASS);

        let columns = build_columns(Role::Commercial, &Labels::default());
        for column in &columns {
            let expected = match column.field {
                Some(ColumnField::Quantity | ColumnField::RemainingStock) => SHORTFALL_STYLE_CLASS,
                _ => "",
            };
            assert_eq!(row.cell_class(column), expected, "column {}", column.label);
        }
    }

    #[test]
    fn missing_quantities_default_to_zero() {
        let row = project_row(&line("1", None, Some(4.0)));
        assert_eq!(row.quantity, 0.0);
        assert_eq!(row.remaining_stock, 4.0);

        let row = project_row(&line("2", Some(2.0), None));
        assert_eq!(row.quantity_in_stock, 0.0);
        assert_eq!(row.remaining_stock, -2.0);
        assert!(row.shortfall);
    }

    #[test]
    fn zero_remaining_is_not_a_shortfall() {
        let row = project_row(&line("1", Some(3.0), Some(3.0)));
        assert_eq!(row.remaining_stock, 0.0);
        assert!(!row.shortfall);
        assert!(row.row_style_class.is_empty());
    }

    #[test]
    fn decimal_quantities_are_not_rounded() {
        let row = project_row(&line("1", Some(1.25), Some(2.5)));
        assert_eq!(row.remaining_stock, 1.25);
    }

    #[test]
    fn empty_and_null_inputs_yield_nothing() {
        let empty = project_rows(Some(&[]));
        assert!(empty.rows.is_empty());
        assert!(!empty.any_shortfall);

        let null = project_rows(None);
        assert!(null.rows.is_empty());
        assert!(!null.any_shortfall);
    }

    #[test]
    fn any_shortfall_tracks_each_row_sign() {
        let raw = vec![
            line("1", Some(1.0), Some(10.0)),
            line("2", Some(7.0), Some(2.0)),
            line("3", None, None),
        ];
        let projection = project_rows(Some(&raw));
        assert!(projection.any_shortfall);
        for row in &projection.rows {
            assert_eq!(row.shortfall, row.remaining_stock < 0.0);
            assert_eq!(row.remaining_stock, row.quantity_in_stock - row.quantity);
        }

        let healthy = project_rows(Some(&raw[..1]));
        assert!(!healthy.any_shortfall);
    }

    #[test]
    fn projection_is_deterministic() {
        let raw = vec![line("1", Some(5.0), Some(3.0)), line("2", Some(1.0), Some(9.0))];
        assert_eq!(project_rows(Some(&raw)), project_rows(Some(&raw)));
    }

    #[test]
    fn identifiers_and_prices_pass_through() {
        let mut raw = line("9", Some(1.0), Some(1.0));
        raw.unit_price = None;
        let row = project_row(&raw);
        assert_eq!(row.line_item_id.as_str(), "9");
        assert_eq!(row.product_id, Some(ProductId::new("01t9")));
        assert_eq!(row.unit_price, None);
        assert_eq!(row.total_price, Some(10.0));
    }
}

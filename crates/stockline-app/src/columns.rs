// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ColumnDescriptor, ColumnField, ColumnKind, Labels, Role, RowActionName};

pub const DELETE_COLUMN_WIDTH: u16 = 50;
pub const VIEW_COLUMN_WIDTH: u16 = 120;

/// Ordered column layout for a role. The role must already come from a
/// trusted source; this only decides which actions are shown.
pub fn build_columns(role: Role, labels: &Labels) -> Vec<ColumnDescriptor> {
    let mut columns = Vec::with_capacity(7);
    if role.is_admin() {
        columns.push(view_column(labels));
    }
    columns.extend(base_columns(labels));
    columns.push(delete_column(labels));
    columns
}

fn base_columns(labels: &Labels) -> [ColumnDescriptor; 5] {
    [
        data_column(&labels.product_name, ColumnField::ProductName, ColumnKind::Text, false),
        data_column(&labels.quantity, ColumnField::Quantity, ColumnKind::Number, true),
        data_column(&labels.unit_price, ColumnField::UnitPrice, ColumnKind::Currency, false),
        data_column(&labels.total_price, ColumnField::TotalPrice, ColumnKind::Currency, false),
        // Titled "in stock" but shows what is left after this opportunity.
        data_column(
            &labels.quantity_in_stock,
            ColumnField::RemainingStock,
            ColumnKind::Number,
            true,
        ),
    ]
}

fn data_column(
    label: &str,
    field: ColumnField,
    kind: ColumnKind,
    styled: bool,
) -> ColumnDescriptor {
    ColumnDescriptor {
        label: label.to_owned(),
        field: Some(field),
        kind,
        width_hint: None,
        action: None,
        styled,
    }
}

fn delete_column(labels: &Labels) -> ColumnDescriptor {
    ColumnDescriptor {
        label: labels.delete.clone(),
        field: None,
        kind: ColumnKind::Action,
        width_hint: Some(DELETE_COLUMN_WIDTH),
        action: Some(RowActionName::Delete),
        styled: false,
    }
}

fn view_column(labels: &Labels) -> ColumnDescriptor {
    ColumnDescriptor {
        label: labels.view_product.clone(),
        field: None,
        kind: ColumnKind::Action,
        width_hint: Some(VIEW_COLUMN_WIDTH),
        action: Some(RowActionName::View),
        styled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::build_columns;
    use crate::{ColumnField, ColumnKind, Labels, Role, RowActionName};

    #[test]
    fn column_count_depends_only_on_admin() {
        let labels = Labels::default();
        assert_eq!(build_columns(Role::Admin, &labels).len(), 7);
        assert_eq!(build_columns(Role::Commercial, &labels).len(), 6);
        assert_eq!(build_columns(Role::Other, &labels).len(), 6);
    }

    #[test]
    fn admin_view_column_comes_first_and_delete_last() {
        let columns = build_columns(Role::Admin, &Labels::default());
        assert_eq!(columns[0].action, Some(RowActionName::View));
        assert_eq!(columns[0].width_hint, Some(120));
        let last = columns.last().expect("delete column");
        assert_eq!(last.action, Some(RowActionName::Delete));
        assert_eq!(last.width_hint, Some(50));
    }

    #[test]
    fn non_admin_roles_get_no_view_column() {
        for role in [Role::Commercial, Role::Other] {
            let columns = build_columns(role, &Labels::default());
            assert!(
                columns
                    .iter()
                    .all(|column| column.action != Some(RowActionName::View)),
                "role {}",
                role.as_str()
            );
        }
    }

    #[test]
    fn base_columns_keep_fixed_order_and_styling() {
        let columns = build_columns(Role::Commercial, &Labels::default());
        let fields = columns
            .iter()
            .map(|column| column.field_name())
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            vec![
                Some("productName"),
                Some("quantity"),
                Some("unitPrice"),
                Some("totalPrice"),
                Some("remainingStock"),
                None,
            ]
        );
        let styled = columns
            .iter()
            .filter(|column| column.styled)
            .filter_map(|column| column.field)
            .collect::<Vec<_>>();
        assert_eq!(
            styled,
            vec![ColumnField::Quantity, ColumnField::RemainingStock]
        );
        assert_eq!(columns[2].kind, ColumnKind::Currency);
        assert_eq!(columns[4].label, "Quantity In Stock");
    }

    #[test]
    fn labels_flow_into_descriptors() {
        let labels = Labels {
            delete: "Supprimer".to_owned(),
            view_product: "Voir".to_owned(),
            ..Labels::default()
        };
        let columns = build_columns(Role::Admin, &labels);
        assert_eq!(columns[0].label, "Voir");
        assert_eq!(columns[6].label, "Supprimer");
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::Product;

pub const FEATURED_GLYPH: &str = "⭐";
pub const NOT_FEATURED_GLYPH: &str = "❌";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnId {
    Image,
    Name,
    Slug,
    Price,
    Featured,
    Category,
    Brand,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    Actions,
}

impl ColumnId {
    pub const ALL: [Self; 11] = [
        Self::Image,
        Self::Name,
        Self::Slug,
        Self::Price,
        Self::Featured,
        Self::Category,
        Self::Brand,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
        Self::Actions,
    ];

    pub const fn header(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Name => "Name",
            Self::Slug => "Slug",
            Self::Price => "Price",
            Self::Featured => "Featured",
            Self::Category => "Category",
            Self::Brand => "Brand",
            Self::CreatedAt => "Created At",
            Self::UpdatedAt => "Updated At",
            Self::DeletedAt => "Deleted At",
            Self::Actions => "",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "imageUrl",
            Self::Name => "name",
            Self::Slug => "slug",
            Self::Price => "price",
            Self::Featured => "isFeatured",
            Self::Category => "category.name",
            Self::Brand => "brand.name",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
            Self::DeletedAt => "deletedAt",
            Self::Actions => "actions",
        }
    }

    pub const fn is_hideable(self) -> bool {
        !matches!(self, Self::Actions)
    }

    pub const fn align_right(self) -> bool {
        matches!(self, Self::Price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFormat {
    pub currency_symbol: String,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_owned(),
        }
    }
}

/// Display text for one cell. The actions column renders as a menu, not text.
pub fn cell_text(column: ColumnId, product: &Product, format: &CellFormat) -> String {
    match column {
        ColumnId::Image => product.image_url.clone(),
        ColumnId::Name => product.name.clone(),
        ColumnId::Slug => product.slug.clone(),
        ColumnId::Price => format_price(product.price, &format.currency_symbol),
        ColumnId::Featured => featured_glyph(product.is_featured).to_owned(),
        ColumnId::Category => product.category.name.clone(),
        ColumnId::Brand => product
            .brand
            .as_ref()
            .map(|brand| brand.name.clone())
            .unwrap_or_default(),
        ColumnId::CreatedAt => format_timestamp(product.created_at),
        ColumnId::UpdatedAt => format_timestamp(product.updated_at),
        ColumnId::DeletedAt => product
            .deleted_at
            .map(format_timestamp)
            .unwrap_or_default(),
        ColumnId::Actions => String::from("…"),
    }
}

pub const fn featured_glyph(featured: bool) -> &'static str {
    if featured {
        FEATURED_GLYPH
    } else {
        NOT_FEATURED_GLYPH
    }
}

pub fn format_price(price: f64, symbol: &str) -> String {
    let cents = (price * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let absolute = cents.unsigned_abs();
    let whole = absolute / 100;
    let fraction = absolute % 100;
    format!("{sign}{symbol}{}.{fraction:02}", group_thousands(whole))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&format_description!(
            "[year]-[month]-[day] [hour]:[minute]"
        ))
        .unwrap_or_else(|_| value.date().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Update,
    SoftDelete,
    HardDelete,
    Restore,
    ViewRatings,
    Feature,
    Unfeature,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Update => "Update",
            Self::SoftDelete => "Trash",
            Self::HardDelete => "Delete permanently",
            Self::Restore => "Restore",
            Self::ViewRatings => "Ratings",
            Self::Feature => "Feature",
            Self::Unfeature => "Unfeature",
        }
    }
}

/// Menu items for one row, in display order.
pub fn row_actions(product: &Product) -> Vec<RowAction> {
    let mut actions = vec![
        RowAction::Update,
        RowAction::SoftDelete,
        RowAction::HardDelete,
    ];
    if product.is_deleted() {
        actions.push(RowAction::Restore);
    }
    actions.push(RowAction::ViewRatings);
    actions.push(if product.is_featured {
        RowAction::Unfeature
    } else {
        RowAction::Feature
    });
    actions
}

#[cfg(test)]
mod tests {
    use super::{
        CellFormat, ColumnId, RowAction, cell_text, format_price, format_timestamp, row_actions,
    };
    use crate::{Brand, BrandId, Product};
    use time::OffsetDateTime;
    use time::macros::datetime;

    #[test]
    fn price_is_grouped_with_two_decimals() {
        assert_eq!(format_price(0.0, "€"), "€0.00");
        assert_eq!(format_price(19.999, "€"), "€20.00");
        assert_eq!(format_price(1_234_567.5, "$"), "$1,234,567.50");
        assert_eq!(format_price(-12.3, "€"), "-€12.30");
    }

    #[test]
    fn timestamps_render_minutes() {
        assert_eq!(
            format_timestamp(datetime!(2025-03-01 09:05 UTC)),
            "2025-03-01 09:05"
        );
    }

    #[test]
    fn deleted_at_is_blank_when_absent() {
        let format = CellFormat::default();
        let mut product = Product::blank();
        assert_eq!(cell_text(ColumnId::DeletedAt, &product, &format), "");
        product.deleted_at = Some(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(
            cell_text(ColumnId::DeletedAt, &product, &format),
            "1970-01-01 00:00"
        );
    }

    #[test]
    fn featured_and_brand_cells() {
        let format = CellFormat::default();
        let mut product = Product::blank();
        assert_eq!(cell_text(ColumnId::Featured, &product, &format), "❌");
        assert_eq!(cell_text(ColumnId::Brand, &product, &format), "");
        product.is_featured = true;
        product.brand = Some(Brand {
            id: BrandId::new("b-1"),
            name: "Lumen".to_owned(),
        });
        assert_eq!(cell_text(ColumnId::Featured, &product, &format), "⭐");
        assert_eq!(cell_text(ColumnId::Brand, &product, &format), "Lumen");
    }

    #[test]
    fn restore_only_offered_for_deleted_rows() {
        let mut product = Product::blank();
        assert!(!row_actions(&product).contains(&RowAction::Restore));
        product.deleted_at = Some(OffsetDateTime::UNIX_EPOCH);
        assert!(row_actions(&product).contains(&RowAction::Restore));
    }

    #[test]
    fn feature_toggle_matches_current_flag() {
        let mut product = Product::blank();
        let actions = row_actions(&product);
        assert!(actions.contains(&RowAction::Feature));
        assert!(!actions.contains(&RowAction::Unfeature));

        product.is_featured = true;
        let actions = row_actions(&product);
        assert!(actions.contains(&RowAction::Unfeature));
        assert!(!actions.contains(&RowAction::Feature));
    }

    #[test]
    fn actions_column_is_not_hideable() {
        assert!(!ColumnId::Actions.is_hideable());
        assert!(ColumnId::DeletedAt.is_hideable());
    }
}

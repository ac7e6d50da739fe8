// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(deserialize_with = "decimal_price")]
    pub price: f64,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub brand: Option<Brand>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

/// Decimal columns may arrive as JSON strings (`"49.50"`) or numbers.
fn decimal_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(f64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Number(value) => Ok(value),
        Wire::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| de::Error::invalid_value(Unexpected::Str(&text), &"a decimal price")),
    }
}

impl Product {
    /// Empty product used as the edit target when creating.
    pub fn blank() -> Self {
        Self {
            id: ProductId::default(),
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            image_url: String::new(),
            price: 0.0,
            is_featured: false,
            category: Category::default(),
            brand: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Default for Product {
    fn default() -> Self {
        Self::blank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn average_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|rating| u32::from(rating.rating)).sum();
    Some(f64::from(sum) / ratings.len() as f64)
}

/// One page of the product listing as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: u64,
    pub total_pages: u64,
}

/// Listing parameters. `page` is 1-based as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub include_deleted: bool,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            include_deleted: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Body sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub is_featured: bool,
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
}

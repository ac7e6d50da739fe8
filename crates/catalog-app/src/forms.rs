// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationErrors};

use crate::{BrandId, CategoryId, Product, ProductPayload};

/// Brand choice meaning "no brand". Never sent to the server.
pub const BRAND_NONE: &str = "__none__";

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductFormInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: String,
    #[validate(url(message = "image URL must be an absolute URL"))]
    pub image_url: Option<String>,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    pub is_featured: bool,
    #[validate(length(min = 1, message = "category is required"))]
    pub category_id: String,
    pub brand_id: Option<String>,
}

impl ProductFormInput {
    pub fn blank() -> Self {
        Self::from_product(&Product::blank())
    }

    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: non_blank(&product.image_url),
            price: product.price,
            is_featured: product.is_featured,
            category_id: product.category.id.as_str().to_owned(),
            brand_id: product
                .brand
                .as_ref()
                .map(|brand| brand.id.as_str().to_owned()),
        }
    }

    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            image_url: self.image_url.as_deref().and_then(non_blank),
            price: self.price,
            is_featured: self.is_featured,
            category_id: self.category_id.trim().to_owned(),
            brand_id: self.brand_id.as_deref().and_then(non_blank),
        }
    }

    /// Runs the schema and, when it passes, builds the wire payload.
    pub fn to_payload(&self) -> Result<ProductPayload, FieldErrors> {
        let input = self.normalized();
        if !input.price.is_finite() {
            return Err(FieldErrors::single("price", "price must be a number"));
        }
        input.validate().map_err(FieldErrors::from)?;

        let brand_id = match input.brand_id.as_deref() {
            None | Some(BRAND_NONE) => None,
            Some(id) => Some(BrandId::new(id)),
        };
        Ok(ProductPayload {
            name: input.name,
            description: input.description,
            image_url: input.image_url.unwrap_or_default(),
            price: input.price,
            is_featured: input.is_featured,
            category_id: CategoryId::new(input.category_id),
            brand_id,
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.to_owned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("invalid {field}"));
                out.push(&field, &message);
            }
        }
        out
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{field}: {message}"))
            })
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Parses a typed price. Accepts an optional leading currency symbol and
/// thousands separators.
pub fn parse_price(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['€', '$'])
        .chars()
        .filter(|ch| *ch != ',' && *ch != '_')
        .collect();
    if cleaned.is_empty() {
        bail!("price is required -- enter a number like 19.99");
    }
    let value: f64 = cleaned
        .parse()
        .with_context(|| format!("invalid price {raw:?}; enter a number like 19.99"))?;
    if !value.is_finite() {
        bail!("invalid price {raw:?}; enter a number like 19.99");
    }
    Ok(value)
}

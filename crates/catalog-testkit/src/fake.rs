// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};
use catalog_app::{
    Brand, Category, Product, ProductId, ProductPage, ProductPayload, ProductQuery,
    ProductsService, Rating,
};
use time::Duration;

use crate::{reference_now, slugify};

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    List(ProductQuery),
    Create(ProductPayload),
    Update(ProductId, ProductPayload),
    SoftDelete(ProductId),
    HardDelete(ProductId),
    Restore(ProductId),
    Feature(ProductId),
    Unfeature(ProductId),
    Ratings(ProductId),
    Categories,
    Brands,
}

impl ServiceCall {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// True for calls that never change server state.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Self::List(_) | Self::Ratings(_) | Self::Categories | Self::Brands
        )
    }
}

/// In-memory product server. Every call is recorded in `calls`.
#[derive(Debug, Clone, Default)]
pub struct FakeCatalog {
    products: Vec<Product>,
    ratings: BTreeMap<ProductId, Vec<Rating>>,
    categories: Vec<Category>,
    brands: Vec<Brand>,
    next_id: u64,
    ticks: i64,
    fail_next: Option<String>,
    fail_listing: bool,
    pub calls: Vec<ServiceCall>,
}

impl FakeCatalog {
    pub fn new(categories: Vec<Category>, brands: Vec<Brand>) -> Self {
        Self {
            categories,
            brands,
            ..Self::default()
        }
    }

    /// Adds a row as if another client created it.
    pub fn insert_external(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn set_ratings(&mut self, id: &ProductId, ratings: Vec<Rating>) {
        self.ratings.insert(id.clone(), ratings);
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id.as_str() == id)
    }

    /// Makes the next call of any kind fail with `message`.
    pub fn fail_next(&mut self, message: &str) {
        self.fail_next = Some(message.to_owned());
    }

    /// Makes every listing fail until cleared.
    pub fn fail_listing(&mut self, fail: bool) {
        self.fail_listing = fail;
    }

    pub fn mutation_calls(&self) -> Vec<&ServiceCall> {
        self.calls.iter().filter(|call| !call.is_read()).collect()
    }

    pub fn list_calls(&self) -> usize {
        self.calls.iter().filter(|call| call.is_list()).count()
    }

    fn record(&mut self, call: ServiceCall) -> Result<()> {
        self.calls.push(call);
        if let Some(message) = self.fail_next.take() {
            bail!("{message}");
        }
        Ok(())
    }

    fn tick(&mut self) -> time::OffsetDateTime {
        self.ticks += 1;
        reference_now() + Duration::minutes(self.ticks)
    }

    fn find_mut(&mut self, id: &ProductId) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|product| &product.id == id)
            .ok_or_else(|| anyhow!("product {id} not found"))
    }

    fn resolve(&self, payload: &ProductPayload) -> Result<(Category, Option<Brand>)> {
        let category = self
            .categories
            .iter()
            .find(|category| category.id == payload.category_id)
            .cloned()
            .ok_or_else(|| anyhow!("category {} not found", payload.category_id))?;
        let brand = match &payload.brand_id {
            Some(id) => Some(
                self.brands
                    .iter()
                    .find(|brand| &brand.id == id)
                    .cloned()
                    .ok_or_else(|| anyhow!("brand {id} not found"))?,
            ),
            None => None,
        };
        Ok((category, brand))
    }
}

impl ProductsService for FakeCatalog {
    fn list_products(&mut self, query: &ProductQuery) -> Result<ProductPage> {
        self.record(ServiceCall::List(*query))?;
        if self.fail_listing {
            bail!("listing unavailable");
        }

        let visible: Vec<&Product> = self
            .products
            .iter()
            .filter(|product| query.include_deleted || !product.is_deleted())
            .collect();
        let page_size = query.page_size.max(1) as usize;
        let total_count = visible.len() as u64;
        let total_pages = visible.len().div_ceil(page_size) as u64;
        let skip = (query.page.max(1) as usize - 1) * page_size;
        let products = visible
            .into_iter()
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect();

        Ok(ProductPage {
            products,
            total_count,
            total_pages,
        })
    }

    fn create_product(&mut self, payload: &ProductPayload) -> Result<Product> {
        self.record(ServiceCall::Create(payload.clone()))?;
        let (category, brand) = self.resolve(payload)?;
        self.next_id += 1;
        let now = self.tick();
        let product = Product {
            id: ProductId::new(format!("p-{}", self.next_id)),
            name: payload.name.clone(),
            slug: slugify(&payload.name),
            description: payload.description.clone(),
            image_url: payload.image_url.clone(),
            price: payload.price,
            is_featured: payload.is_featured,
            category,
            brand,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.products.push(product.clone());
        Ok(product)
    }

    fn update_product(&mut self, id: &ProductId, payload: &ProductPayload) -> Result<Product> {
        self.record(ServiceCall::Update(id.clone(), payload.clone()))?;
        let (category, brand) = self.resolve(payload)?;
        let now = self.tick();
        let product = self.find_mut(id)?;
        product.name = payload.name.clone();
        product.slug = slugify(&payload.name);
        product.description = payload.description.clone();
        product.image_url = payload.image_url.clone();
        product.price = payload.price;
        product.is_featured = payload.is_featured;
        product.category = category;
        product.brand = brand;
        product.updated_at = now;
        Ok(product.clone())
    }

    fn soft_delete_product(&mut self, id: &ProductId) -> Result<()> {
        self.record(ServiceCall::SoftDelete(id.clone()))?;
        let now = self.tick();
        let product = self.find_mut(id)?;
        product.deleted_at = Some(now);
        Ok(())
    }

    fn hard_delete_product(&mut self, id: &ProductId) -> Result<()> {
        self.record(ServiceCall::HardDelete(id.clone()))?;
        let before = self.products.len();
        self.products.retain(|product| &product.id != id);
        if self.products.len() == before {
            bail!("product {id} not found");
        }
        self.ratings.remove(id);
        Ok(())
    }

    fn restore_product(&mut self, id: &ProductId) -> Result<()> {
        self.record(ServiceCall::Restore(id.clone()))?;
        let product = self.find_mut(id)?;
        product.deleted_at = None;
        Ok(())
    }

    fn feature_product(&mut self, id: &ProductId) -> Result<()> {
        self.record(ServiceCall::Feature(id.clone()))?;
        self.find_mut(id)?.is_featured = true;
        Ok(())
    }

    fn unfeature_product(&mut self, id: &ProductId) -> Result<()> {
        self.record(ServiceCall::Unfeature(id.clone()))?;
        self.find_mut(id)?.is_featured = false;
        Ok(())
    }

    fn list_ratings(&mut self, id: &ProductId) -> Result<Vec<Rating>> {
        self.record(ServiceCall::Ratings(id.clone()))?;
        if self.product(id.as_str()).is_none() {
            bail!("product {id} not found");
        }
        Ok(self.ratings.get(id).cloned().unwrap_or_default())
    }

    fn list_categories(&mut self) -> Result<Vec<Category>> {
        self.record(ServiceCall::Categories)?;
        Ok(self.categories.clone())
    }

    fn list_brands(&mut self) -> Result<Vec<Brand>> {
        self.record(ServiceCall::Brands)?;
        Ok(self.brands.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{FakeCatalog, ServiceCall};
    use crate::{sample_brand, sample_category, sample_product};
    use catalog_app::{CategoryId, ProductId, ProductPayload, ProductQuery, ProductsService};

    fn catalog_with(count: usize) -> FakeCatalog {
        let mut catalog = FakeCatalog::new(
            vec![sample_category("c-1", "Lighting")],
            vec![sample_brand("b-1", "Lumen")],
        );
        for index in 1..=count {
            catalog.insert_external(sample_product(
                &format!("p-{index}"),
                &format!("Item {index}"),
                index as f64,
            ));
        }
        catalog
    }

    fn query(page: u32, page_size: u32, include_deleted: bool) -> ProductQuery {
        ProductQuery {
            include_deleted,
            page,
            page_size,
        }
    }

    #[test]
    fn listing_paginates_with_ceiling_pages() {
        let mut catalog = catalog_with(7);
        let page = catalog.list_products(&query(2, 3, false)).expect("list");
        assert_eq!(page.total_count, 7);
        assert_eq!(page.total_pages, 3);
        let ids: Vec<&str> = page.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p-4", "p-5", "p-6"]);
    }

    #[test]
    fn soft_deleted_rows_hidden_unless_requested() {
        let mut catalog = catalog_with(3);
        catalog
            .soft_delete_product(&ProductId::new("p-2"))
            .expect("soft delete");
        let hidden = catalog.list_products(&query(1, 10, false)).expect("list");
        assert_eq!(hidden.total_count, 2);
        let shown = catalog.list_products(&query(1, 10, true)).expect("list");
        assert_eq!(shown.total_count, 3);
    }

    #[test]
    fn create_rejects_unknown_category() {
        let mut catalog = catalog_with(0);
        let payload = ProductPayload {
            name: "Lamp".to_owned(),
            description: String::new(),
            image_url: String::new(),
            price: 5.0,
            is_featured: false,
            category_id: CategoryId::new("nope"),
            brand_id: None,
        };
        assert!(catalog.create_product(&payload).is_err());
        assert!(catalog.products().is_empty());
        assert_eq!(catalog.calls, vec![ServiceCall::Create(payload)]);
    }

    #[test]
    fn fail_next_applies_once() {
        let mut catalog = catalog_with(1);
        catalog.fail_next("boom");
        let err = catalog
            .list_products(&query(1, 10, false))
            .expect_err("first call fails");
        assert_eq!(err.to_string(), "boom");
        assert!(catalog.list_products(&query(1, 10, false)).is_ok());
    }

    #[test]
    fn hard_delete_missing_row_errors() {
        let mut catalog = catalog_with(1);
        assert!(catalog.hard_delete_product(&ProductId::new("p-9")).is_err());
        assert!(catalog.hard_delete_product(&ProductId::new("p-1")).is_ok());
        assert!(catalog.products().is_empty());
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{
    Brand, Category, ColumnId, DEFAULT_PAGE_SIZE, FieldErrors, Product, ProductFormInput,
    ProductId, ProductPage, ProductQuery, Rating,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub data: Vec<Product>,
    pub loading: bool,
    pub column_visibility: BTreeMap<ColumnId, bool>,
    /// 0-based; the wire page is `page_index + 1`.
    pub page_index: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub page_count: u64,
}

impl TableState {
    pub fn new(include_deleted: bool, page_size: u32) -> Self {
        Self {
            data: Vec::new(),
            loading: true,
            column_visibility: BTreeMap::from([(ColumnId::DeletedAt, include_deleted)]),
            page_index: 0,
            page_size: page_size.max(1),
            total_count: 0,
            page_count: 0,
        }
    }

    pub fn query(&self, include_deleted: bool) -> ProductQuery {
        ProductQuery {
            include_deleted,
            page: self.page_index.saturating_add(1),
            page_size: self.page_size,
        }
    }

    /// Replaces rows and totals wholesale.
    pub fn replace_page(&mut self, page: ProductPage) {
        self.data = page.products;
        self.total_count = page.total_count;
        self.page_count = page.total_pages;
    }

    /// Pulls the page index back into range. Returns true when it moved.
    pub fn clamp_page_index(&mut self) -> bool {
        let last = if self.page_count == 0 {
            0
        } else {
            u32::try_from(self.page_count - 1).unwrap_or(u32::MAX)
        };
        if self.page_index > last {
            self.page_index = last;
            return true;
        }
        false
    }

    pub fn is_column_visible(&self, column: ColumnId) -> bool {
        self.column_visibility.get(&column).copied().unwrap_or(true)
    }

    pub fn set_column_visibility(&mut self, column: ColumnId, visible: bool) {
        self.column_visibility.insert(column, visible);
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page_index) + 1 < self.page_count
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 0
    }
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(false, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    /// Edit target; blank when creating.
    pub product: Product,
    pub input: ProductFormInput,
    pub errors: FieldErrors,
    pub is_edit_mode: bool,
    pub open_sheet: bool,
    pub is_data_loading: bool,
}

impl FormState {
    pub fn load(&mut self, product: Product, edit_mode: bool) {
        self.input = ProductFormInput::from_product(&product);
        self.product = product;
        self.errors = FieldErrors::default();
        self.is_edit_mode = edit_mode;
        self.open_sheet = true;
    }

    pub fn close(&mut self) {
        self.open_sheet = false;
        self.errors = FieldErrors::default();
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            product: Product::blank(),
            input: ProductFormInput::blank(),
            errors: FieldErrors::default(),
            is_edit_mode: false,
            open_sheet: false,
            is_data_loading: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    #[default]
    Soft,
    Hard,
    Restore,
}

impl DeleteMode {
    pub const fn alert(self) -> AlertMessage {
        match self {
            Self::Soft => AlertMessage {
                title: "Trash it?",
                description: "Wanna trash it? You can dig it back later.",
            },
            Self::Hard => AlertMessage {
                title: "Flatline this?",
                description: "You're reaching the point of no return.",
            },
            Self::Restore => AlertMessage {
                title: "Revive it?",
                description: "Bring it back to life?",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertMessage {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteState {
    pub delete_mode: DeleteMode,
    pub open_confirm_dialog: bool,
    pub selected_product_id: ProductId,
    pub alert_message: AlertMessage,
}

impl DeleteState {
    pub fn request(&mut self, mode: DeleteMode, product_id: ProductId) {
        self.alert_message = mode.alert();
        self.selected_product_id = product_id;
        self.delete_mode = mode;
        self.open_confirm_dialog = true;
    }

    pub fn close(&mut self) {
        self.open_confirm_dialog = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingsState {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub ratings: Vec<Rating>,
    pub open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub loaded: bool,
}

impl ReferenceData {
    pub fn category_name(&self, id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.id.as_str() == id)
            .map(|category| category.name.as_str())
    }

    pub fn brand_name(&self, id: &str) -> Option<&str> {
        self.brands
            .iter()
            .find(|brand| brand.id.as_str() == id)
            .map(|brand| brand.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductsState {
    pub table: TableState,
    pub form: FormState,
    pub delete: DeleteState,
    pub ratings: RatingsState,
    pub reference: ReferenceData,
    pub error: Option<String>,
    pub include_deleted: bool,
}

impl ProductsState {
    pub fn new(include_deleted: bool, page_size: u32) -> Self {
        Self {
            table: TableState::new(include_deleted, page_size),
            form: FormState::default(),
            delete: DeleteState::default(),
            ratings: RatingsState::default(),
            reference: ReferenceData::default(),
            error: None,
            include_deleted,
        }
    }
}

impl Default for ProductsState {
    fn default() -> Self {
        Self::new(false, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeleteMode, DeleteState, FormState, TableState};
    use crate::{ColumnId, Product, ProductId, ProductPage};

    #[test]
    fn deleted_column_follows_include_deleted() {
        assert!(!TableState::new(false, 10).is_column_visible(ColumnId::DeletedAt));
        assert!(TableState::new(true, 10).is_column_visible(ColumnId::DeletedAt));
        assert!(TableState::new(false, 10).is_column_visible(ColumnId::Name));
    }

    #[test]
    fn query_uses_one_based_page() {
        let mut table = TableState::new(false, 25);
        table.page_index = 2;
        let query = table.query(true);
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 25);
        assert!(query.include_deleted);
    }

    #[test]
    fn replace_page_overwrites_rows() {
        let mut table = TableState::default();
        table.data = vec![Product::blank(), Product::blank()];
        table.replace_page(ProductPage {
            products: vec![Product::blank()],
            total_count: 1,
            total_pages: 1,
        });
        assert_eq!(table.data.len(), 1);
        assert_eq!(table.total_count, 1);
        assert_eq!(table.page_count, 1);
    }

    #[test]
    fn clamp_page_index_respects_page_count() {
        let mut table = TableState::default();
        table.page_index = 4;
        table.page_count = 3;
        assert!(table.clamp_page_index());
        assert_eq!(table.page_index, 2);
        assert!(!table.clamp_page_index());

        table.page_count = 0;
        assert!(table.clamp_page_index());
        assert_eq!(table.page_index, 0);
    }

    #[test]
    fn page_navigation_bounds() {
        let mut table = TableState::default();
        table.page_count = 2;
        assert!(table.has_next_page());
        assert!(!table.has_previous_page());
        table.page_index = 1;
        assert!(!table.has_next_page());
        assert!(table.has_previous_page());
    }

    #[test]
    fn delete_request_sets_prompt_per_mode() {
        let mut state = DeleteState::default();
        state.request(DeleteMode::Hard, ProductId::new("p-1"));
        assert!(state.open_confirm_dialog);
        assert_eq!(state.alert_message.title, "Flatline this?");
        assert_eq!(state.selected_product_id.as_str(), "p-1");

        state.close();
        assert!(!state.open_confirm_dialog);
        assert_eq!(state.delete_mode, DeleteMode::Hard);
    }

    #[test]
    fn form_load_resets_errors_and_opens_sheet() {
        let mut form = FormState::default();
        form.errors.push("name", "name is required");
        let product = Product {
            name: "Lamp".to_owned(),
            ..Product::blank()
        };
        form.load(product, true);
        assert!(form.open_sheet);
        assert!(form.is_edit_mode);
        assert!(form.errors.is_empty());
        assert_eq!(form.input.name, "Lamp");
    }
}

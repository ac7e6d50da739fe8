// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

use crate::{
    Brand, Category, ColumnId, DeleteMode, FieldErrors, MutationKind, Notice, Notifier, PRODUCTS,
    Product, ProductFormInput, ProductId, ProductPage, ProductPayload, ProductQuery,
    ProductsState, Rating, ResourceLabel, RowAction,
};

/// Remote product resource. Implemented over HTTP by `catalog-api` and in
/// memory by the testkit.
pub trait ProductsService {
    fn list_products(&mut self, query: &ProductQuery) -> Result<ProductPage>;
    fn create_product(&mut self, payload: &ProductPayload) -> Result<Product>;
    fn update_product(&mut self, id: &ProductId, payload: &ProductPayload) -> Result<Product>;
    fn soft_delete_product(&mut self, id: &ProductId) -> Result<()>;
    fn hard_delete_product(&mut self, id: &ProductId) -> Result<()>;
    fn restore_product(&mut self, id: &ProductId) -> Result<()>;
    fn feature_product(&mut self, id: &ProductId) -> Result<()>;
    fn unfeature_product(&mut self, id: &ProductId) -> Result<()>;
    fn list_ratings(&mut self, id: &ProductId) -> Result<Vec<Rating>>;
    fn list_categories(&mut self) -> Result<Vec<Category>>;
    fn list_brands(&mut self) -> Result<Vec<Brand>>;

    /// Runs a listing and reports it on `tx`. Implementations backed by a
    /// network client override this to run off the UI thread.
    fn spawn_list_products(
        &mut self,
        ticket: FetchTicket,
        tx: Sender<FetchCompletion>,
    ) -> Result<()> {
        let result = self.list_products(&ticket.query);
        tx.send(FetchCompletion { ticket, result })
            .map_err(|_| anyhow!("fetch result channel closed"))?;
        Ok(())
    }
}

impl<S: ProductsService + ?Sized> ProductsService for &mut S {
    fn list_products(&mut self, query: &ProductQuery) -> Result<ProductPage> {
        (**self).list_products(query)
    }

    fn create_product(&mut self, payload: &ProductPayload) -> Result<Product> {
        (**self).create_product(payload)
    }

    fn update_product(&mut self, id: &ProductId, payload: &ProductPayload) -> Result<Product> {
        (**self).update_product(id, payload)
    }

    fn soft_delete_product(&mut self, id: &ProductId) -> Result<()> {
        (**self).soft_delete_product(id)
    }

    fn hard_delete_product(&mut self, id: &ProductId) -> Result<()> {
        (**self).hard_delete_product(id)
    }

    fn restore_product(&mut self, id: &ProductId) -> Result<()> {
        (**self).restore_product(id)
    }

    fn feature_product(&mut self, id: &ProductId) -> Result<()> {
        (**self).feature_product(id)
    }

    fn unfeature_product(&mut self, id: &ProductId) -> Result<()> {
        (**self).unfeature_product(id)
    }

    fn list_ratings(&mut self, id: &ProductId) -> Result<Vec<Rating>> {
        (**self).list_ratings(id)
    }

    fn list_categories(&mut self) -> Result<Vec<Category>> {
        (**self).list_categories()
    }

    fn list_brands(&mut self) -> Result<Vec<Brand>> {
        (**self).list_brands()
    }

    fn spawn_list_products(
        &mut self,
        ticket: FetchTicket,
        tx: Sender<FetchCompletion>,
    ) -> Result<()> {
        (**self).spawn_list_products(ticket, tx)
    }
}

/// Identifies one listing request. Only the most recently issued ticket is
/// allowed to update the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub token: u64,
    pub query: ProductQuery,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: Result<ProductPage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// Superseded by a newer request; discarded.
    Stale,
    Failed,
    /// The page index was pulled back into range and must be fetched again.
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed,
    /// Validation failed; no request was issued.
    Rejected,
    /// Another action is in flight; no request was issued.
    Busy,
    Ignored,
}

pub struct ProductsController<S, N> {
    service: S,
    notifier: N,
    state: ProductsState,
    label: ResourceLabel,
    fetch_token: u64,
}

impl<S: ProductsService, N: Notifier> ProductsController<S, N> {
    pub fn new(service: S, notifier: N, include_deleted: bool, page_size: u32) -> Self {
        Self {
            service,
            notifier,
            state: ProductsState::new(include_deleted, page_size),
            label: PRODUCTS,
            fetch_token: 0,
        }
    }

    pub fn state(&self) -> &ProductsState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProductsState {
        &mut self.state
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn label(&self) -> ResourceLabel {
        self.label
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_token = self.fetch_token.wrapping_add(1);
        self.state.table.loading = true;
        let query = self.state.table.query(self.state.include_deleted);
        debug!(token = self.fetch_token, ?query, "fetching products");
        FetchTicket {
            token: self.fetch_token,
            query,
        }
    }

    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ProductPage>,
    ) -> FetchOutcome {
        if ticket.token != self.fetch_token {
            warn!(
                token = ticket.token,
                current = self.fetch_token,
                "discarding stale product listing"
            );
            return FetchOutcome::Stale;
        }

        self.state.table.loading = false;
        match result {
            Ok(page) => {
                self.state.table.replace_page(page);
                self.state.error = None;
                if self.state.table.clamp_page_index() {
                    FetchOutcome::OutOfRange
                } else {
                    FetchOutcome::Applied
                }
            }
            Err(err) => {
                self.state.error = Some(format!("Failed to fetch {}", self.label.plural_lower()));
                error!("fetch {} failed: {err:#}", self.label.plural_lower());
                FetchOutcome::Failed
            }
        }
    }

    pub fn fetch_products(&mut self) -> FetchOutcome {
        let ticket = self.begin_fetch();
        let result = self.service.list_products(&ticket.query);
        let outcome = self.finish_fetch(ticket, result);
        if outcome != FetchOutcome::OutOfRange {
            return outcome;
        }

        let ticket = self.begin_fetch();
        let result = self.service.list_products(&ticket.query);
        self.finish_fetch(ticket, result)
    }

    /// Issues a listing through the service's background path. The result
    /// arrives on `tx` and must be handed to `finish_fetch`.
    pub fn spawn_fetch(&mut self, tx: Sender<FetchCompletion>) -> Result<FetchTicket> {
        let ticket = self.begin_fetch();
        if let Err(err) = self.service.spawn_list_products(ticket, tx) {
            self.state.table.loading = false;
            return Err(err);
        }
        Ok(ticket)
    }

    pub fn set_include_deleted(&mut self, include_deleted: bool) {
        self.state.include_deleted = include_deleted;
        self.state
            .table
            .set_column_visibility(ColumnId::DeletedAt, include_deleted);
        self.state.table.page_index = 0;
    }

    pub fn go_to_page(&mut self, page_index: u32) -> bool {
        let table = &mut self.state.table;
        let in_range = table.page_count == 0 || u64::from(page_index) < table.page_count;
        if !in_range || page_index == table.page_index {
            return false;
        }
        table.page_index = page_index;
        true
    }

    pub fn next_page(&mut self) -> bool {
        if !self.state.table.has_next_page() {
            return false;
        }
        self.state.table.page_index += 1;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.state.table.has_previous_page() {
            return false;
        }
        self.state.table.page_index -= 1;
        true
    }

    pub fn set_page_size(&mut self, page_size: u32) -> bool {
        let page_size = page_size.clamp(1, crate::MAX_PAGE_SIZE);
        if page_size == self.state.table.page_size {
            return false;
        }
        self.state.table.page_size = page_size;
        self.state.table.page_index = 0;
        true
    }

    pub fn toggle_column(&mut self, column: ColumnId) -> bool {
        if !column.is_hideable() {
            return false;
        }
        let visible = self.state.table.is_column_visible(column);
        self.state.table.set_column_visibility(column, !visible);
        true
    }

    pub fn handle_create(&mut self) {
        self.state.form.load(Product::blank(), false);
    }

    pub fn handle_update(&mut self, product: &Product) {
        self.state.form.load(product.clone(), true);
    }

    pub fn close_form(&mut self) {
        self.state.form.close();
    }

    pub fn submit(&mut self, values: ProductFormInput) -> ActionOutcome {
        if self.state.form.is_data_loading {
            return ActionOutcome::Busy;
        }

        self.state.form.input = values;
        let payload = match self.state.form.input.to_payload() {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(%errors, "product form rejected");
                self.state.form.errors = errors;
                return ActionOutcome::Rejected;
            }
        };
        self.state.form.errors = FieldErrors::default();

        self.state.form.is_data_loading = true;
        let outcome = if self.state.form.is_edit_mode {
            let id = self.state.form.product.id.clone();
            self.run_mutation(MutationKind::Update, |service| {
                service.update_product(&id, &payload)
            })
        } else {
            self.run_mutation(MutationKind::Create, |service| {
                service.create_product(&payload)
            })
        };

        self.fetch_products();
        self.state.form.close();
        self.state.form.is_data_loading = false;
        outcome
    }

    pub fn handle_soft_delete(&mut self, product_id: ProductId) {
        self.state.delete.request(DeleteMode::Soft, product_id);
    }

    pub fn handle_hard_delete(&mut self, product_id: ProductId) {
        self.state.delete.request(DeleteMode::Hard, product_id);
    }

    pub fn handle_restore(&mut self, product_id: ProductId) {
        self.state.delete.request(DeleteMode::Restore, product_id);
    }

    pub fn cancel_delete(&mut self) {
        self.state.delete.close();
    }

    pub fn confirm_delete(&mut self) -> ActionOutcome {
        if !self.state.delete.open_confirm_dialog {
            return ActionOutcome::Ignored;
        }
        if self.state.form.is_data_loading {
            return ActionOutcome::Busy;
        }

        self.state.form.is_data_loading = true;
        let id = self.state.delete.selected_product_id.clone();
        let outcome = match self.state.delete.delete_mode {
            DeleteMode::Soft => self.run_mutation(MutationKind::SoftDelete, |service| {
                service.soft_delete_product(&id)
            }),
            DeleteMode::Hard => self.run_mutation(MutationKind::HardDelete, |service| {
                service.hard_delete_product(&id)
            }),
            DeleteMode::Restore => self.run_mutation(MutationKind::Restore, |service| {
                service.restore_product(&id)
            }),
        };

        self.fetch_products();
        self.state.delete.close();
        self.state.form.is_data_loading = false;
        outcome
    }

    pub fn handle_feature(&mut self, product_id: &ProductId) -> ActionOutcome {
        self.toggle_featured(product_id, MutationKind::Feature)
    }

    pub fn handle_unfeature(&mut self, product_id: &ProductId) -> ActionOutcome {
        self.toggle_featured(product_id, MutationKind::Unfeature)
    }

    fn toggle_featured(&mut self, product_id: &ProductId, kind: MutationKind) -> ActionOutcome {
        if self.state.form.is_data_loading {
            return ActionOutcome::Busy;
        }

        self.state.form.is_data_loading = true;
        let outcome = self.run_mutation(kind, |service| match kind {
            MutationKind::Unfeature => service.unfeature_product(product_id),
            _ => service.feature_product(product_id),
        });
        self.fetch_products();
        self.state.form.is_data_loading = false;
        outcome
    }

    pub fn view_ratings(&mut self, product: &Product) -> ActionOutcome {
        match self.service.list_ratings(&product.id) {
            Ok(ratings) => {
                let ratings_state = &mut self.state.ratings;
                ratings_state.product_id = Some(product.id.clone());
                ratings_state.product_name = product.name.clone();
                ratings_state.ratings = ratings;
                ratings_state.open = true;
                ActionOutcome::Completed
            }
            Err(err) => {
                error!(product = %product.id, "load ratings failed: {err:#}");
                self.notifier.notify(Notice::error(format!(
                    "Failed to load ratings for {}",
                    self.label.singular_lower()
                )));
                ActionOutcome::Failed
            }
        }
    }

    pub fn close_ratings(&mut self) {
        self.state.ratings.open = false;
    }

    /// Loads categories and brands for the form's choice fields.
    pub fn load_reference_data(&mut self) -> ActionOutcome {
        let loaded = self.service.list_categories().and_then(|categories| {
            let brands = self.service.list_brands()?;
            Ok((categories, brands))
        });
        match loaded {
            Ok((categories, brands)) => {
                let reference = &mut self.state.reference;
                reference.categories = categories;
                reference.brands = brands;
                reference.loaded = true;
                ActionOutcome::Completed
            }
            Err(err) => {
                error!("load categories and brands failed: {err:#}");
                self.notifier
                    .notify(Notice::error("Failed to load categories and brands"));
                ActionOutcome::Failed
            }
        }
    }

    pub fn run_row_action(&mut self, action: RowAction, product: &Product) -> ActionOutcome {
        match action {
            RowAction::Update => {
                self.handle_update(product);
                ActionOutcome::Completed
            }
            RowAction::SoftDelete => {
                self.handle_soft_delete(product.id.clone());
                ActionOutcome::Completed
            }
            RowAction::HardDelete => {
                self.handle_hard_delete(product.id.clone());
                ActionOutcome::Completed
            }
            RowAction::Restore => {
                if !product.is_deleted() {
                    return ActionOutcome::Ignored;
                }
                self.handle_restore(product.id.clone());
                ActionOutcome::Completed
            }
            RowAction::ViewRatings => self.view_ratings(product),
            RowAction::Feature => self.handle_feature(&product.id),
            RowAction::Unfeature => self.handle_unfeature(&product.id),
        }
    }

    fn run_mutation<T>(
        &mut self,
        kind: MutationKind,
        call: impl FnOnce(&mut S) -> Result<T>,
    ) -> ActionOutcome {
        self.notifier
            .notify(Notice::loading(kind.loading_message(self.label)));
        match call(&mut self.service) {
            Ok(_) => {
                info!(action = ?kind, "{} mutation succeeded", self.label.singular_lower());
                self.notifier
                    .notify(Notice::success(kind.success_message(self.label)));
                ActionOutcome::Completed
            }
            Err(err) => {
                error!(action = ?kind, "{} mutation failed: {err:#}", self.label.singular_lower());
                self.notifier
                    .notify(Notice::error(kind.error_message(self.label)));
                ActionOutcome::Failed
            }
        }
    }
}

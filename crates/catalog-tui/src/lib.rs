// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use catalog_app::{
    ActionOutcome, BRAND_NONE, CellFormat, ColumnId, FetchCompletion, FetchOutcome, FieldErrors,
    MAX_PAGE_SIZE, Notice, NoticeLevel, Notifier, Product, ProductFormInput, ProductsController,
    ProductsService, ProductsState, RatingsState, ReferenceData, RowAction, average_rating,
    cell_text, featured_glyph, format_timestamp, parse_price, row_actions,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const PAGE_SIZES: [u32; 5] = [5, 10, 20, 50, 100];
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const KEY_HINTS: &str = "j/k row | n/p page | +/- size | c new | e edit | enter actions | d/D delete | r restore | f feature | R ratings | x deleted | v cols | ? help | q quit";

pub type Controller<S> = ProductsController<S, StatusNotifier>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

/// Notifier backing the status line. Settled notices clear themselves a few
/// seconds later once a clear channel is attached.
#[derive(Debug, Default)]
pub struct StatusNotifier {
    current: Option<Notice>,
    token: u64,
    clear_tx: Option<Sender<InternalEvent>>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    fn attach(&mut self, tx: Sender<InternalEvent>) {
        self.clear_tx = Some(tx);
    }

    fn clear(&mut self, token: u64) {
        if token == self.token {
            self.current = None;
        }
    }
}

impl Notifier for StatusNotifier {
    fn notify(&mut self, notice: Notice) {
        self.token = self.token.saturating_add(1);
        let settled = notice.level != NoticeLevel::Loading;
        self.current = Some(notice);
        if settled && let Some(tx) = &self.clear_tx {
            schedule_status_clear(tx, self.token);
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Name,
    Description,
    ImageUrl,
    Price,
    Featured,
    Category,
    Brand,
}

impl FormField {
    const ALL: [Self; 7] = [
        Self::Name,
        Self::Description,
        Self::ImageUrl,
        Self::Price,
        Self::Featured,
        Self::Category,
        Self::Brand,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::ImageUrl => "image URL",
            Self::Price => "price",
            Self::Featured => "featured",
            Self::Category => "category",
            Self::Brand => "brand",
        }
    }

    const fn error_key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::ImageUrl => "image_url",
            Self::Price => "price",
            Self::Featured => "is_featured",
            Self::Category => "category_id",
            Self::Brand => "brand_id",
        }
    }

    const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Name | Self::Description | Self::ImageUrl | Self::Price
        )
    }
}

/// Editable buffers behind the form panel.
#[derive(Debug, Clone, PartialEq, Default)]
struct FormUiState {
    field_index: usize,
    name: String,
    description: String,
    image_url: String,
    price: String,
    is_featured: bool,
    category_index: Option<usize>,
    /// 0 is "(none)"; `n` is `brands[n - 1]`.
    brand_index: usize,
    /// Brand id from the edited row that the loaded brand list lacks. Sent
    /// back as-is until the brand choice is cycled.
    kept_brand: Option<String>,
}

impl FormUiState {
    fn from_input(input: &ProductFormInput, reference: &ReferenceData) -> Self {
        let category_index = reference
            .categories
            .iter()
            .position(|category| category.id.as_str() == input.category_id);
        let brand_index = input
            .brand_id
            .as_deref()
            .and_then(|id| reference.brands.iter().position(|brand| brand.id.as_str() == id))
            .map_or(0, |index| index + 1);
        let kept_brand = input
            .brand_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != BRAND_NONE && brand_index == 0)
            .map(str::to_owned);
        Self {
            field_index: 0,
            name: input.name.clone(),
            description: input.description.clone(),
            image_url: input.image_url.clone().unwrap_or_default(),
            price: format!("{:.2}", input.price),
            is_featured: input.is_featured,
            category_index,
            brand_index,
            kept_brand,
        }
    }

    fn field(&self) -> FormField {
        FormField::ALL[self.field_index.min(FormField::ALL.len() - 1)]
    }

    fn move_field(&mut self, delta: isize) {
        let len = FormField::ALL.len() as isize;
        self.field_index = (self.field_index as isize + delta).rem_euclid(len) as usize;
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field() {
            FormField::Name => Some(&mut self.name),
            FormField::Description => Some(&mut self.description),
            FormField::ImageUrl => Some(&mut self.image_url),
            FormField::Price => Some(&mut self.price),
            _ => None,
        }
    }

    fn cycle_choice(&mut self, delta: isize, reference: &ReferenceData) {
        match self.field() {
            FormField::Featured => self.is_featured = !self.is_featured,
            FormField::Category => {
                let len = reference.categories.len();
                if len == 0 {
                    return;
                }
                let next = match self.category_index {
                    None if delta < 0 => len - 1,
                    None => 0,
                    Some(index) => (index as isize + delta).rem_euclid(len as isize) as usize,
                };
                self.category_index = Some(next);
            }
            FormField::Brand => {
                let len = (reference.brands.len() + 1) as isize;
                self.brand_index = (self.brand_index as isize + delta).rem_euclid(len) as usize;
                self.kept_brand = None;
            }
            _ => {}
        }
    }

    fn type_char(&mut self, ch: char, reference: &ReferenceData) {
        if let Some(text) = self.text_mut() {
            text.push(ch);
        } else if ch == ' ' {
            self.cycle_choice(1, reference);
        }
    }

    fn backspace(&mut self) {
        if let Some(text) = self.text_mut() {
            text.pop();
        }
    }

    fn display(&self, field: FormField, reference: &ReferenceData) -> String {
        match field {
            FormField::Name => self.name.clone(),
            FormField::Description => self.description.clone(),
            FormField::ImageUrl => self.image_url.clone(),
            FormField::Price => self.price.clone(),
            FormField::Featured => featured_glyph(self.is_featured).to_owned(),
            FormField::Category => self
                .category_index
                .and_then(|index| reference.categories.get(index))
                .map_or_else(|| "(choose)".to_owned(), |category| category.name.clone()),
            FormField::Brand => match self.brand_index {
                0 if self.kept_brand.is_some() => "(unlisted brand)".to_owned(),
                0 => "(none)".to_owned(),
                index => reference
                    .brands
                    .get(index - 1)
                    .map_or_else(|| "(none)".to_owned(), |brand| brand.name.clone()),
            },
        }
    }

    /// Builds the controller's input. Only the price is checked here since
    /// it has to be parsed from text.
    fn to_input(&self, reference: &ReferenceData) -> Result<ProductFormInput, FieldErrors> {
        let price = parse_price(&self.price)
            .map_err(|error| FieldErrors::single("price", &error.to_string()))?;
        let category_id = self
            .category_index
            .and_then(|index| reference.categories.get(index))
            .map(|category| category.id.as_str().to_owned())
            .unwrap_or_default();
        let brand_id = match self.brand_index {
            0 => self
                .kept_brand
                .clone()
                .unwrap_or_else(|| BRAND_NONE.to_owned()),
            index => reference
                .brands
                .get(index - 1)
                .map_or_else(|| BRAND_NONE.to_owned(), |brand| brand.id.as_str().to_owned()),
        };
        Ok(ProductFormInput {
            name: self.name.clone(),
            description: self.description.clone(),
            image_url: Some(self.image_url.clone()),
            price,
            is_featured: self.is_featured,
            category_id,
            brand_id: Some(brand_id),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    format: CellFormat,
    selected_row: usize,
    form: Option<FormUiState>,
    action_cursor: Option<usize>,
    column_cursor: Option<usize>,
    help_visible: bool,
}

pub fn run_app<S: ProductsService>(controller: &mut Controller<S>, format: CellFormat) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let (fetch_tx, fetch_rx) = mpsc::channel();
    controller.notifier_mut().attach(internal_tx);

    let mut view = ViewData {
        format,
        ..ViewData::default()
    };
    request_fetch(controller, &fetch_tx);

    let mut result: Result<()> = Ok(());
    loop {
        process_internal_events(controller, &internal_rx);
        process_fetch_completions(controller, &mut view, &fetch_tx, &fetch_rx);

        let status = controller.notifier().current();
        if let Err(error) = terminal.draw(|frame| render(frame, controller.state(), status, &view))
        {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(controller, &mut view, &fetch_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<S: ProductsService>(
    controller: &mut Controller<S>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } => controller.notifier_mut().clear(token),
        }
    }
}

fn process_fetch_completions<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    fetch_tx: &Sender<FetchCompletion>,
    fetch_rx: &Receiver<FetchCompletion>,
) {
    while let Ok(completion) = fetch_rx.try_recv() {
        match controller.finish_fetch(completion.ticket, completion.result) {
            FetchOutcome::OutOfRange => request_fetch(controller, fetch_tx),
            FetchOutcome::Failed => {
                let message = controller
                    .state()
                    .error
                    .clone()
                    .unwrap_or_else(|| "fetch failed".to_owned());
                controller.notifier_mut().notify(Notice::error(message));
            }
            FetchOutcome::Applied | FetchOutcome::Stale => {}
        }
        clamp_selection(controller, view);
    }
}

fn request_fetch<S: ProductsService>(controller: &mut Controller<S>, fetch_tx: &Sender<FetchCompletion>) {
    if let Err(error) = controller.spawn_fetch(fetch_tx.clone()) {
        warn!("could not start product fetch: {error:#}");
        controller
            .notifier_mut()
            .notify(Notice::error(format!("fetch failed: {error}")));
    }
}

fn handle_key_event<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    fetch_tx: &Sender<FetchCompletion>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view.help_visible = false;
        }
        return false;
    }

    if controller.state().delete.open_confirm_dialog {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let outcome = controller.confirm_delete();
                report_busy(controller, outcome);
                clamp_selection(controller, view);
            }
            KeyCode::Char('n') | KeyCode::Esc => controller.cancel_delete(),
            _ => {}
        }
        return false;
    }

    if controller.state().ratings.open {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            controller.close_ratings();
        }
        return false;
    }

    if view.form.is_some() {
        handle_form_key(controller, view, key);
        return false;
    }

    if view.action_cursor.is_some() {
        handle_action_menu_key(controller, view, key);
        return false;
    }

    if view.column_cursor.is_some() {
        handle_column_panel_key(controller, view, key);
        return false;
    }

    handle_table_key(controller, view, fetch_tx, key)
}

fn report_busy<S: ProductsService>(controller: &mut Controller<S>, outcome: ActionOutcome) {
    if outcome == ActionOutcome::Busy {
        controller
            .notifier_mut()
            .notify(Notice::info("another change is still saving"));
    }
}

fn handle_table_key<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    fetch_tx: &Sender<FetchCompletion>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view.help_visible = true,
        KeyCode::Char('j') | KeyCode::Down => move_row(controller, view, 1),
        KeyCode::Char('k') | KeyCode::Up => move_row(controller, view, -1),
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
            if controller.next_page() {
                view.selected_row = 0;
                request_fetch(controller, fetch_tx);
            }
        }
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
            if controller.previous_page() {
                view.selected_row = 0;
                request_fetch(controller, fetch_tx);
            }
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let size = step_page_size(controller.state().table.page_size, true);
            if controller.set_page_size(size) {
                view.selected_row = 0;
                request_fetch(controller, fetch_tx);
            }
        }
        KeyCode::Char('-') => {
            let size = step_page_size(controller.state().table.page_size, false);
            if controller.set_page_size(size) {
                view.selected_row = 0;
                request_fetch(controller, fetch_tx);
            }
        }
        KeyCode::Char('g') => request_fetch(controller, fetch_tx),
        KeyCode::Char('x') => {
            let include = !controller.state().include_deleted;
            controller.set_include_deleted(include);
            view.selected_row = 0;
            let label = if include {
                "showing deleted"
            } else {
                "hiding deleted"
            };
            controller.notifier_mut().notify(Notice::info(label));
            request_fetch(controller, fetch_tx);
        }
        KeyCode::Char('v') => view.column_cursor = Some(0),
        KeyCode::Char('c') => open_form(controller, view, None),
        KeyCode::Char('e') => with_selected(controller, view, RowAction::Update),
        KeyCode::Enter => {
            if selected_product(controller, view).is_some() {
                view.action_cursor = Some(0);
            }
        }
        KeyCode::Char('d') => with_selected(controller, view, RowAction::SoftDelete),
        KeyCode::Char('D') => with_selected(controller, view, RowAction::HardDelete),
        KeyCode::Char('r') => with_selected(controller, view, RowAction::Restore),
        KeyCode::Char('R') => with_selected(controller, view, RowAction::ViewRatings),
        KeyCode::Char('f') => {
            let Some(product) = selected_product(controller, view) else {
                notify_no_selection(controller);
                return false;
            };
            let action = if product.is_featured {
                RowAction::Unfeature
            } else {
                RowAction::Feature
            };
            apply_row_action(controller, view, action, &product);
        }
        _ => {}
    }
    false
}

fn handle_form_key<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    key: KeyEvent,
) {
    let Some(form) = view.form.as_mut() else {
        return;
    };
    let reference = &controller.state().reference;
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            controller.close_form();
            view.form = None;
        }
        (KeyCode::Enter, _) | (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
            submit_form(controller, view);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => form.move_field(1),
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => form.move_field(-1),
        (KeyCode::Left, _) => form.cycle_choice(-1, reference),
        (KeyCode::Right, _) => form.cycle_choice(1, reference),
        (KeyCode::Backspace, _) => form.backspace(),
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            form.type_char(ch, reference);
        }
        _ => {}
    }
}

fn submit_form<S: ProductsService>(controller: &mut Controller<S>, view: &mut ViewData) {
    let Some(form) = &view.form else {
        return;
    };
    let input = match form.to_input(&controller.state().reference) {
        Ok(input) => input,
        Err(errors) => {
            debug!(%errors, "form input rejected before submit");
            controller.state_mut().form.errors = errors;
            return;
        }
    };

    match controller.submit(input) {
        ActionOutcome::Rejected => {}
        ActionOutcome::Busy => report_busy(controller, ActionOutcome::Busy),
        _ => {
            view.form = None;
            clamp_selection(controller, view);
        }
    }
}

fn handle_action_menu_key<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    key: KeyEvent,
) {
    let Some(product) = selected_product(controller, view) else {
        view.action_cursor = None;
        return;
    };
    let actions = row_actions(&product);
    let cursor = view.action_cursor.unwrap_or(0).min(actions.len() - 1);
    match key.code {
        KeyCode::Esc => view.action_cursor = None,
        KeyCode::Char('j') | KeyCode::Down => {
            view.action_cursor = Some((cursor + 1) % actions.len());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.action_cursor = Some((cursor + actions.len() - 1) % actions.len());
        }
        KeyCode::Enter => {
            view.action_cursor = None;
            apply_row_action(controller, view, actions[cursor], &product);
        }
        _ => {}
    }
}

fn handle_column_panel_key<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    key: KeyEvent,
) {
    let columns = hideable_columns();
    let cursor = view.column_cursor.unwrap_or(0).min(columns.len() - 1);
    match key.code {
        KeyCode::Esc | KeyCode::Char('v') => view.column_cursor = None,
        KeyCode::Char('j') | KeyCode::Down => {
            view.column_cursor = Some((cursor + 1) % columns.len());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.column_cursor = Some((cursor + columns.len() - 1) % columns.len());
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            controller.toggle_column(columns[cursor]);
        }
        _ => {}
    }
}

fn open_form<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    product: Option<&Product>,
) {
    if !controller.state().reference.loaded {
        controller.load_reference_data();
    }
    match product {
        Some(product) => controller.handle_update(product),
        None => controller.handle_create(),
    }
    let state = controller.state();
    view.form = Some(FormUiState::from_input(&state.form.input, &state.reference));
}

fn with_selected<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    action: RowAction,
) {
    match selected_product(controller, view) {
        Some(product) => apply_row_action(controller, view, action, &product),
        None => notify_no_selection(controller),
    }
}

fn apply_row_action<S: ProductsService>(
    controller: &mut Controller<S>,
    view: &mut ViewData,
    action: RowAction,
    product: &Product,
) {
    if action == RowAction::Update {
        open_form(controller, view, Some(product));
        return;
    }
    match controller.run_row_action(action, product) {
        ActionOutcome::Ignored if action == RowAction::Restore => {
            controller
                .notifier_mut()
                .notify(Notice::info("only trashed products can be restored"));
        }
        outcome => report_busy(controller, outcome),
    }
    clamp_selection(controller, view);
}

fn notify_no_selection<S: ProductsService>(controller: &mut Controller<S>) {
    controller
        .notifier_mut()
        .notify(Notice::info("no product selected"));
}

fn selected_product<S: ProductsService>(controller: &Controller<S>, view: &ViewData) -> Option<Product> {
    controller.state().table.data.get(view.selected_row).cloned()
}

fn move_row<S: ProductsService>(controller: &Controller<S>, view: &mut ViewData, delta: isize) {
    let len = controller.state().table.data.len();
    if len == 0 {
        view.selected_row = 0;
        return;
    }
    let next = (view.selected_row as isize + delta).clamp(0, len as isize - 1);
    view.selected_row = next as usize;
}

fn clamp_selection<S: ProductsService>(controller: &Controller<S>, view: &mut ViewData) {
    let len = controller.state().table.data.len();
    view.selected_row = view.selected_row.min(len.saturating_sub(1));
}

fn step_page_size(current: u32, grow: bool) -> u32 {
    if grow {
        PAGE_SIZES
            .iter()
            .copied()
            .find(|size| *size > current)
            .unwrap_or(MAX_PAGE_SIZE)
    } else {
        PAGE_SIZES
            .iter()
            .rev()
            .copied()
            .find(|size| *size < current)
            .unwrap_or(PAGE_SIZES[0])
    }
}

fn hideable_columns() -> Vec<ColumnId> {
    ColumnId::ALL
        .into_iter()
        .filter(|column| column.is_hideable())
        .collect()
}

fn visible_columns(state: &ProductsState) -> Vec<ColumnId> {
    ColumnId::ALL
        .into_iter()
        .filter(|column| state.table.is_column_visible(*column))
        .collect()
}

fn column_width(column: ColumnId) -> Constraint {
    match column {
        ColumnId::Name => Constraint::Min(16),
        ColumnId::Image | ColumnId::Slug => Constraint::Min(12),
        ColumnId::Category | ColumnId::Brand => Constraint::Min(10),
        ColumnId::Price => Constraint::Length(12),
        ColumnId::Featured => Constraint::Length(8),
        ColumnId::CreatedAt | ColumnId::UpdatedAt | ColumnId::DeletedAt => Constraint::Length(16),
        ColumnId::Actions => Constraint::Length(3),
    }
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &ProductsState,
    status: Option<&Notice>,
    view: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().title("catalog admin").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_table(frame, layout[1], state, view);

    let status_style = match status.map(|notice| notice.level) {
        Some(NoticeLevel::Error) => Style::default().fg(Color::Red),
        Some(NoticeLevel::Success) => Style::default().fg(Color::Green),
        Some(NoticeLevel::Loading) => Style::default().fg(Color::Yellow),
        Some(NoticeLevel::Info) | None => Style::default().fg(Color::White),
    };
    let status_widget = Paragraph::new(status_text(status))
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(form) = &view.form {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);
        let title = if state.form.is_edit_mode {
            "edit product"
        } else {
            "new product"
        };
        let panel = Paragraph::new(form_overlay_text(form, state))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(panel, area);
    }

    if let Some(cursor) = view.action_cursor
        && let Some(product) = state.table.data.get(view.selected_row)
    {
        let area = centered_rect(36, 40, frame.area());
        frame.render_widget(Clear, area);
        let menu = Paragraph::new(action_menu_text(product, cursor))
            .block(Block::default().title("actions").borders(Borders::ALL));
        frame.render_widget(menu, area);
    }

    if let Some(cursor) = view.column_cursor {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        let panel = Paragraph::new(column_panel_text(state, cursor))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(panel, area);
    }

    if state.ratings.open {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let panel = Paragraph::new(ratings_overlay_text(&state.ratings))
            .block(Block::default().title("ratings").borders(Borders::ALL));
        frame.render_widget(panel, area);
    }

    if state.delete.open_confirm_dialog {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let alert = state.delete.alert_message;
        let dialog = Paragraph::new(format!(
            "{}\n\ny/enter confirm | n/esc cancel",
            alert.description
        ))
        .block(
            Block::default()
                .title(alert.title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(dialog, area);
    }

    if view.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &ProductsState, view: &ViewData) {
    let columns = visible_columns(state);
    let widths = columns.iter().copied().map(column_width).collect::<Vec<_>>();

    let header = Row::new(columns.iter().map(|column| {
        Cell::from(column.header()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = state.table.data.iter().enumerate().map(|(index, product)| {
        let mut style = Style::default();
        if product.is_deleted() {
            style = style
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT);
        }
        if index == view.selected_row {
            style = style.bg(Color::DarkGray);
        }
        let cells = columns.iter().map(|column| {
            let text = cell_text(*column, product, &view.format);
            let line = if column.align_right() {
                Line::from(text).right_aligned()
            } else {
                Line::from(text)
            };
            Cell::from(line)
        });
        Row::new(cells).style(style)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(table_title(state)).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn header_text(state: &ProductsState) -> String {
    let table = &state.table;
    let deleted = if state.include_deleted {
        "shown"
    } else {
        "hidden"
    };
    let mut text = format!(
        "Products | page {}/{} | {} total | {} per page | deleted {deleted}",
        table.page_index + 1,
        table.page_count.max(1),
        table.total_count,
        table.page_size,
    );
    if table.loading {
        text.push_str(" | loading...");
    }
    text
}

fn table_title(state: &ProductsState) -> String {
    match &state.error {
        Some(error) => format!("products: {error}"),
        None if state.table.data.is_empty() && !state.table.loading => {
            "products: nothing here yet".to_owned()
        }
        None => "products".to_owned(),
    }
}

fn status_text(status: Option<&Notice>) -> String {
    match status {
        Some(notice) => format!("{} | {KEY_HINTS}", notice.message),
        None => KEY_HINTS.to_owned(),
    }
}

fn form_overlay_text(form: &FormUiState, state: &ProductsState) -> String {
    let reference = &state.reference;
    let errors = &state.form.errors;
    let mut out = String::new();
    for (index, field) in FormField::ALL.into_iter().enumerate() {
        let marker = if index == form.field_index { ">" } else { " " };
        let mut value = form.display(field, reference);
        if !field.is_text() {
            value = format!("< {value} >");
        }
        out.push_str(&format!("{marker} {:<12} {value}\n", field.label()));
        if let Some(messages) = errors.get(field.error_key()) {
            for message in messages {
                out.push_str(&format!("    ! {message}\n"));
            }
        }
    }
    out.push('\n');
    if state.form.is_data_loading {
        out.push_str("saving...\n");
    }
    out.push_str("tab/shift+tab field | left/right choose | enter save | esc cancel");
    out
}

fn action_menu_text(product: &Product, cursor: usize) -> String {
    let mut out = format!("{}\n\n", product.name);
    for (index, action) in row_actions(product).into_iter().enumerate() {
        let marker = if index == cursor { ">" } else { " " };
        out.push_str(&format!("{marker} {}\n", action.label()));
    }
    out
}

fn column_panel_text(state: &ProductsState, cursor: usize) -> String {
    let mut out = String::new();
    for (index, column) in hideable_columns().into_iter().enumerate() {
        let marker = if index == cursor { ">" } else { " " };
        let check = if state.table.is_column_visible(column) {
            "x"
        } else {
            " "
        };
        out.push_str(&format!("{marker} [{check}] {}\n", column.header()));
    }
    out.push_str("\nspace toggle | esc close");
    out
}

fn ratings_overlay_text(ratings: &RatingsState) -> String {
    let mut out = format!("{}\n", ratings.product_name);
    match average_rating(&ratings.ratings) {
        Some(average) => out.push_str(&format!(
            "average {average:.1} from {} ratings\n\n",
            ratings.ratings.len()
        )),
        None => {
            out.push_str("\nno ratings yet\n");
            return out;
        }
    }
    for rating in &ratings.ratings {
        let filled = usize::from(rating.rating.min(5));
        out.push_str(&format!(
            "{}{} {} {}\n",
            "★".repeat(filled),
            "☆".repeat(5 - filled),
            rating.user_name,
            format_timestamp(rating.created_at)
        ));
        if !rating.comment.is_empty() {
            out.push_str(&format!("  {}\n", rating.comment));
        }
    }
    out
}

fn help_overlay_text() -> &'static str {
    "table: j/k row | n/p or left/right page | +/- page size | g reload | x show deleted | v columns\n\
rows: enter actions | c new | e edit | d trash | D delete permanently | r restore | f feature toggle | R ratings\n\
form: tab/shift+tab field | type to edit | left/right or space choose | enter or ctrl+s save | esc cancel\n\
confirm: y/enter confirm | n/esc cancel\n\
global: ? help | q or ctrl+q quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        Controller, FormUiState, StatusNotifier, ViewData, form_overlay_text, handle_key_event,
        header_text, process_fetch_completions, ratings_overlay_text, render, step_page_size,
        table_title,
    };
    use catalog_app::{
        Brand, BrandId, CellFormat, ColumnId, FetchCompletion, Notice, Notifier, Product,
        ProductsController, ProductsState, Rating, RatingId, RatingsState, ReferenceData,
        cell_text,
    };
    use catalog_testkit::{
        FakeCatalog, ServiceCall, reference_now, sample_brand, sample_category, sample_product,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    struct Harness {
        controller: Controller<FakeCatalog>,
        view: ViewData,
        fetch_tx: mpsc::Sender<FetchCompletion>,
        fetch_rx: mpsc::Receiver<FetchCompletion>,
    }

    impl Harness {
        fn with_products(count: usize) -> Self {
            Self::with_brands(count, vec![sample_brand("b-1", "Lumen")])
        }

        fn with_brands(count: usize, brands: Vec<Brand>) -> Self {
            let mut catalog = FakeCatalog::new(
                vec![
                    sample_category("c-1", "Lighting"),
                    sample_category("c-2", "Furniture"),
                ],
                brands,
            );
            for index in 1..=count {
                catalog.insert_external(sample_product(
                    &format!("P{index}"),
                    &format!("Item {index}"),
                    index as f64,
                ));
            }
            let mut controller =
                ProductsController::new(catalog, StatusNotifier::new(), false, 10);
            controller.fetch_products();
            let (fetch_tx, fetch_rx) = mpsc::channel();
            Self {
                controller,
                view: ViewData::default(),
                fetch_tx,
                fetch_rx,
            }
        }

        fn press(&mut self, code: KeyCode) -> bool {
            self.press_with(code, KeyModifiers::NONE)
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            let quit = handle_key_event(
                &mut self.controller,
                &mut self.view,
                &self.fetch_tx,
                KeyEvent::new(code, modifiers),
            );
            process_fetch_completions(
                &mut self.controller,
                &mut self.view,
                &self.fetch_tx,
                &self.fetch_rx,
            );
            quit
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn mutations(&self) -> Vec<&ServiceCall> {
            self.controller.service().mutation_calls()
        }

        fn message(&self) -> Option<&str> {
            self.controller
                .notifier()
                .current()
                .map(|notice| notice.message.as_str())
        }
    }

    #[test]
    fn status_clear_ignores_superseded_tokens() {
        let mut notifier = StatusNotifier::new();
        notifier.notify(Notice::success("first"));
        notifier.notify(Notice::error("second"));
        notifier.clear(1);
        assert_eq!(
            notifier.current().map(|notice| notice.message.as_str()),
            Some("second")
        );
        notifier.clear(2);
        assert!(notifier.current().is_none());
    }

    #[test]
    fn q_quits_and_ctrl_q_quits_from_overlays() {
        let mut harness = Harness::with_products(1);
        assert!(harness.press(KeyCode::Char('q')));

        harness.press(KeyCode::Char('?'));
        assert!(harness.view.help_visible);
        assert!(!harness.press(KeyCode::Char('q')));
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn x_toggles_deleted_rows_and_refetches_first_page() {
        let mut harness = Harness::with_products(15);
        harness.press(KeyCode::Char('n'));
        assert_eq!(harness.controller.state().table.page_index, 1);

        harness.press(KeyCode::Char('x'));

        let state = harness.controller.state();
        assert!(state.include_deleted);
        assert_eq!(state.table.page_index, 0);
        assert!(state.table.is_column_visible(ColumnId::DeletedAt));
        assert!(matches!(
            harness.controller.service().calls.last(),
            Some(ServiceCall::List(query)) if query.include_deleted && query.page == 1
        ));
    }

    #[test]
    fn paging_keys_fetch_through_channel() {
        let mut harness = Harness::with_products(15);
        harness.press(KeyCode::Char('j'));
        assert_eq!(harness.view.selected_row, 1);

        harness.press(KeyCode::Char('n'));
        assert_eq!(harness.view.selected_row, 0);
        assert_eq!(
            harness.controller.state().table.data[0].id.as_str(),
            "P11"
        );
        assert!(!harness.controller.state().table.loading);

        let lists = harness.controller.service().list_calls();
        harness.press(KeyCode::Char('n'));
        assert_eq!(harness.controller.service().list_calls(), lists);

        harness.press(KeyCode::Char('p'));
        assert_eq!(
            harness.controller.state().table.data[0].id.as_str(),
            "P1"
        );
    }

    #[test]
    fn plus_and_minus_step_page_size() {
        let mut harness = Harness::with_products(30);
        harness.press(KeyCode::Char('+'));
        assert_eq!(harness.controller.state().table.page_size, 20);
        assert_eq!(harness.controller.state().table.data.len(), 20);
        harness.press(KeyCode::Char('-'));
        harness.press(KeyCode::Char('-'));
        assert_eq!(harness.controller.state().table.page_size, 5);

        assert_eq!(step_page_size(100, true), 100);
        assert_eq!(step_page_size(5, false), 5);
        assert_eq!(step_page_size(7, false), 5);
    }

    #[test]
    fn soft_delete_cancel_makes_no_call() {
        let mut harness = Harness::with_products(2);
        harness.press(KeyCode::Char('d'));
        assert!(harness.controller.state().delete.open_confirm_dialog);
        harness.press(KeyCode::Char('n'));
        assert!(!harness.controller.state().delete.open_confirm_dialog);
        assert!(harness.mutations().is_empty());
    }

    #[test]
    fn hard_delete_confirm_removes_selected_row() {
        let mut harness = Harness::with_products(2);
        harness.press_with(KeyCode::Char('D'), KeyModifiers::SHIFT);
        assert_eq!(
            harness.controller.state().delete.alert_message.title,
            "Flatline this?"
        );
        harness.press(KeyCode::Char('y'));

        assert!(matches!(
            harness.mutations().as_slice(),
            [ServiceCall::HardDelete(id)] if id.as_str() == "P1"
        ));
        let ids: Vec<&str> = harness
            .controller
            .state()
            .table
            .data
            .iter()
            .map(|product| product.id.as_str())
            .collect();
        assert_eq!(ids, ["P2"]);
        assert_eq!(harness.message(), Some("Product deleted successfully"));
    }

    #[test]
    fn restore_on_live_row_only_informs() {
        let mut harness = Harness::with_products(1);
        harness.press(KeyCode::Char('r'));
        assert!(!harness.controller.state().delete.open_confirm_dialog);
        assert_eq!(
            harness.message(),
            Some("only trashed products can be restored")
        );
    }

    #[test]
    fn create_form_requires_category_then_saves() {
        let mut harness = Harness::with_products(1);
        harness.press(KeyCode::Char('c'));
        assert!(harness.view.form.is_some());
        assert!(harness.controller.state().reference.loaded);

        harness.type_text("Desk Lamp");
        for _ in 0..3 {
            harness.press(KeyCode::Tab);
        }
        for _ in 0..4 {
            harness.press(KeyCode::Backspace);
        }
        harness.type_text("12.50");
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Tab);

        harness.press(KeyCode::Enter);
        assert!(harness.view.form.is_some());
        assert_eq!(
            harness
                .controller
                .state()
                .form
                .errors
                .first("category_id"),
            Some("category is required")
        );
        assert!(harness.mutations().is_empty());

        harness.press(KeyCode::Right);
        harness.press(KeyCode::Enter);

        assert!(harness.view.form.is_none());
        match harness.mutations().as_slice() {
            [ServiceCall::Create(payload)] => {
                assert_eq!(payload.name, "Desk Lamp");
                assert_eq!(payload.price, 12.5);
                assert_eq!(payload.category_id.as_str(), "c-1");
                assert!(payload.brand_id.is_none());
            }
            other => panic!("unexpected calls: {other:?}"),
        }
        assert_eq!(harness.controller.state().table.total_count, 2);
    }

    #[test]
    fn unparseable_price_stays_in_form() {
        let mut harness = Harness::with_products(0);
        harness.press(KeyCode::Char('c'));
        harness.type_text("Lamp");
        for _ in 0..3 {
            harness.press(KeyCode::Tab);
        }
        harness.type_text("abc");
        harness.press(KeyCode::Enter);

        assert!(harness.view.form.is_some());
        assert!(
            harness
                .controller
                .state()
                .form
                .errors
                .first("price")
                .is_some_and(|message| message.contains("19.99"))
        );
        assert!(harness.mutations().is_empty());
    }

    #[test]
    fn edit_form_prefills_and_escape_cancels() {
        let mut harness = Harness::with_products(1);
        harness.press(KeyCode::Char('e'));
        let form = harness.view.form.clone().expect("form open");
        assert_eq!(form.name, "Item 1");
        assert_eq!(form.price, "1.00");
        assert_eq!(form.category_index, Some(0));
        assert_eq!(form.brand_index, 0);
        assert!(harness.controller.state().form.is_edit_mode);

        harness.press(KeyCode::Esc);
        assert!(harness.view.form.is_none());
        assert!(!harness.controller.state().form.open_sheet);
        assert!(harness.mutations().is_empty());
    }

    #[test]
    fn edit_keeps_brand_missing_from_reference_list() {
        let mut harness = Harness::with_brands(
            0,
            vec![sample_brand("b-1", "Lumen"), sample_brand("b-9", "Retired")],
        );
        harness.controller.service_mut().insert_external(Product {
            brand: Some(sample_brand("b-9", "Retired")),
            ..sample_product("P1", "Item 1", 1.0)
        });
        harness.controller.fetch_products();
        // The cached list predates b-9.
        harness.controller.state_mut().reference = ReferenceData {
            categories: vec![sample_category("c-1", "Lighting")],
            brands: vec![sample_brand("b-1", "Lumen")],
            loaded: true,
        };

        harness.press(KeyCode::Char('e'));
        let form = harness.view.form.clone().expect("form open");
        assert_eq!(form.brand_index, 0);
        assert_eq!(form.kept_brand.as_deref(), Some("b-9"));
        assert!(form_overlay_text(&form, harness.controller.state()).contains("(unlisted brand)"));
        harness.press(KeyCode::Enter);

        let brand = harness.mutations().into_iter().find_map(|call| match call {
            ServiceCall::Update(_, payload) => Some(payload.brand_id.clone()),
            _ => None,
        });
        assert_eq!(brand, Some(Some(BrandId::new("b-9"))));
        assert_eq!(
            harness.controller.state().table.data[0]
                .brand
                .as_ref()
                .map(|brand| brand.id.as_str()),
            Some("b-9")
        );

        // Cycling away and back to "(none)" clears the brand.
        harness.press(KeyCode::Char('e'));
        for _ in 0..6 {
            harness.press(KeyCode::Tab);
        }
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Left);
        let form = harness.view.form.clone().expect("form open");
        assert_eq!(form.brand_index, 0);
        assert!(form.kept_brand.is_none());
        harness.press(KeyCode::Enter);

        let brands: Vec<_> = harness
            .mutations()
            .into_iter()
            .filter_map(|call| match call {
                ServiceCall::Update(_, payload) => Some(payload.brand_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(brands, vec![Some(BrandId::new("b-9")), None]);
    }

    #[test]
    fn f_toggles_featured_glyph() {
        let mut harness = Harness::with_products(1);
        let format = CellFormat::default();
        harness.press(KeyCode::Char('f'));
        let product = &harness.controller.state().table.data[0];
        assert_eq!(cell_text(ColumnId::Featured, product, &format), "⭐");

        harness.press(KeyCode::Char('f'));
        let product = &harness.controller.state().table.data[0];
        assert_eq!(cell_text(ColumnId::Featured, product, &format), "❌");
    }

    #[test]
    fn action_menu_runs_selected_entry() {
        let mut harness = Harness::with_products(1);
        harness.press(KeyCode::Enter);
        assert_eq!(harness.view.action_cursor, Some(0));

        // Update, Trash, Delete permanently, Ratings, Feature
        for _ in 0..3 {
            harness.press(KeyCode::Char('j'));
        }
        harness.press(KeyCode::Enter);

        assert!(harness.view.action_cursor.is_none());
        assert!(harness.controller.state().ratings.open);
        harness.press(KeyCode::Esc);
        assert!(!harness.controller.state().ratings.open);
    }

    #[test]
    fn column_panel_toggles_visibility() {
        let mut harness = Harness::with_products(1);
        harness.press(KeyCode::Char('v'));
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char(' '));
        assert!(
            !harness
                .controller
                .state()
                .table
                .is_column_visible(ColumnId::Name)
        );
        harness.press(KeyCode::Esc);
        assert!(harness.view.column_cursor.is_none());
    }

    #[test]
    fn form_overlay_lists_field_errors() {
        let mut state = ProductsState::default();
        state.form.errors.push("price", "price cannot be negative");
        let form = FormUiState {
            price: "-1".to_owned(),
            field_index: 3,
            ..FormUiState::default()
        };
        let text = form_overlay_text(&form, &state);
        assert!(text.contains("> price"));
        assert!(text.contains("! price cannot be negative"));
        assert!(text.contains("< (choose) >"));
        assert!(text.contains("< (none) >"));
    }

    #[test]
    fn ratings_overlay_shows_average_and_stars() {
        let empty = RatingsState {
            product_name: "Lamp".to_owned(),
            open: true,
            ..RatingsState::default()
        };
        assert!(ratings_overlay_text(&empty).contains("no ratings yet"));

        let rated = RatingsState {
            ratings: vec![Rating {
                id: RatingId::new("r-1"),
                rating: 4,
                comment: "Nice".to_owned(),
                user_name: "Avery".to_owned(),
                created_at: reference_now(),
            }],
            ..empty
        };
        let text = ratings_overlay_text(&rated);
        assert!(text.contains("average 4.0 from 1 ratings"));
        assert!(text.contains("★★★★☆ Avery 2026-01-01 00:00"));
        assert!(text.contains("  Nice"));
    }

    #[test]
    fn header_and_title_reflect_table_state() {
        let mut state = ProductsState::default();
        state.table.loading = false;
        assert_eq!(table_title(&state), "products: nothing here yet");
        state.error = Some("Failed to fetch products".to_owned());
        assert_eq!(table_title(&state), "products: Failed to fetch products");

        state.table.total_count = 42;
        state.table.page_count = 5;
        state.table.page_index = 1;
        assert_eq!(
            header_text(&state),
            "Products | page 2/5 | 42 total | 10 per page | deleted hidden"
        );
    }

    #[test]
    fn render_draws_table_and_status() {
        let mut harness = Harness::with_products(3);
        harness.press(KeyCode::Char('f'));

        let mut terminal = Terminal::new(TestBackend::new(160, 30)).expect("test terminal");
        let state = harness.controller.state();
        let status = harness.controller.notifier().current();
        terminal
            .draw(|frame| render(frame, state, status, &harness.view))
            .expect("draw");

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("catalog admin"));
        assert!(screen.contains("Item 2"));
        assert!(screen.contains("€3.00"));
        assert!(screen.contains("Product featured."));
    }
}

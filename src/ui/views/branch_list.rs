use crate::branches::types::PAGE_SIZE_OPTIONS;
use crate::branches::{Branch, BranchFilter, BranchPage, CachedBranchClient, ListQuery};
use crate::error::BranchError;
use crate::favorites::SharedFavorites;
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, Picker, PickerEvent, PickerItem, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{favorite_marker, range_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::BranchDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

/// Which picker overlay is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerKind {
  City,
  PageSize,
}

/// Paged branch listing with a city selector and a live filter
pub struct BranchListView {
  client: CachedBranchClient,
  favorites: SharedFavorites,
  cities: Vec<String>,
  /// Selected city, sent as `q`; empty means all cities
  city: String,
  page: u32,
  limit: u32,
  /// Server total from the last successful page, kept while refetching
  total: Option<u64>,
  query: Query<BranchPage, BranchError>,
  table_state: TableState,
  search: SearchInput,
  picker: Picker,
  picking: Option<PickerKind>,
  notice: Option<String>,
}

impl BranchListView {
  pub fn new(
    client: CachedBranchClient,
    favorites: SharedFavorites,
    cities: Vec<String>,
    limit: u32,
  ) -> Self {
    let mut view = Self {
      client,
      favorites,
      cities,
      city: String::new(),
      page: 0,
      limit,
      total: None,
      query: Query::new(),
      table_state: TableState::default(),
      search: SearchInput::new(),
      picker: Picker::new(),
      picking: None,
      notice: None,
    };

    // Start fetching immediately
    view.fetch();
    view
  }

  fn offset(&self) -> u32 {
    self.page.saturating_mul(self.limit)
  }

  fn list_query(&self) -> ListQuery {
    ListQuery::new(self.city.clone(), self.limit, self.offset())
  }

  fn fetch(&mut self) {
    let client = self.client.clone();
    let query = self.list_query();
    tracing::debug!(q = %query.q, limit = query.limit, offset = query.offset, "fetching page");
    self
      .query
      .run(async move { client.list_branches(&query).await });
  }

  fn filter(&self) -> BranchFilter {
    BranchFilter::new(self.search.query(), self.city.as_str())
  }

  /// Rows after client-side filtering, each with its serial number
  fn visible_rows(&self) -> Vec<(u64, &Branch)> {
    let items = self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[]);
    let offset = u64::from(self.offset());
    self
      .filter()
      .apply(items)
      .into_iter()
      .enumerate()
      .map(|(idx, branch)| (offset + idx as u64 + 1, branch))
      .collect()
  }

  fn selected_ifsc(&self) -> Option<String> {
    let idx = self.table_state.selected()?;
    self
      .visible_rows()
      .get(idx)
      .map(|(_, branch)| branch.ifsc.clone())
  }

  /// Index of the last page for the known total, if any
  fn last_page(&self, limit: u32) -> Option<u32> {
    let total = self.total?;
    if total == 0 || limit == 0 {
      return Some(0);
    }
    let last = (total - 1) / u64::from(limit);
    Some(u32::try_from(last).unwrap_or(u32::MAX))
  }

  fn next_page(&mut self) {
    match self.last_page(self.limit) {
      Some(last) if self.page < last => {
        self.page += 1;
        self.fetch();
      }
      _ => {}
    }
  }

  fn prev_page(&mut self) {
    if self.page > 0 {
      self.page -= 1;
      self.fetch();
    }
  }

  /// Change the page size. The page index is kept, clamped to the new
  /// last page, so the offset moves with it.
  fn set_limit(&mut self, limit: u32) {
    if limit == self.limit {
      return;
    }
    self.limit = limit;
    if let Some(last) = self.last_page(limit) {
      self.page = self.page.min(last);
    }
    self.fetch();
  }

  /// Choosing a city clears the filter text and starts from the first page
  fn set_city(&mut self, city: String) {
    self.search.reset();
    if city == self.city {
      return;
    }
    tracing::info!(city = %city, "city changed");
    self.city = city;
    self.page = 0;
    self.total = None;
    self.fetch();
  }

  fn toggle_favorite(&mut self) {
    let Some(ifsc) = self.selected_ifsc() else {
      return;
    };
    let result = self.favorites.borrow_mut().toggle(&ifsc);
    self.notice = match result {
      Ok(_) => None,
      Err(e) => {
        tracing::error!(ifsc = %ifsc, error = %e, "failed to save favorites");
        Some("Could not save favorites".to_string())
      }
    };
  }

  fn open_city_picker(&mut self) {
    let mut items = vec![PickerItem::new("None", "")];
    items.extend(
      self
        .cities
        .iter()
        .map(|c| PickerItem::new(capitalize(c), c.to_lowercase())),
    );
    self.picker.show("City", items, &self.city);
    self.picking = Some(PickerKind::City);
  }

  fn open_page_size_picker(&mut self) {
    let items = PAGE_SIZE_OPTIONS
      .iter()
      .map(|n| PickerItem::new(format!("{} per page", n), n.to_string()))
      .collect();
    self
      .picker
      .show("Rows per page", items, &self.limit.to_string());
    self.picking = Some(PickerKind::PageSize);
  }

  fn handle_picked(&mut self, value: String) {
    match self.picking.take() {
      Some(PickerKind::City) => self.set_city(value),
      Some(PickerKind::PageSize) => match value.parse::<u32>() {
        Ok(limit) => self.set_limit(limit),
        Err(e) => tracing::warn!(value = %value, error = %e, "ignoring page size"),
      },
      None => {}
    }
  }

  fn title(&self) -> String {
    let city = if self.city.is_empty() {
      "all cities".to_string()
    } else {
      capitalize(&self.city)
    };
    let filter = self.search.query();

    match self.query.state() {
      QueryState::Loading => format!(" Branches [{}] (loading...) ", city),
      _ if !filter.is_empty() => format!(" Branches [{}] /{} ", city, filter),
      _ => format!(" Branches [{}] ", city),
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible_rows().len();
    ensure_valid_selection(&mut self.table_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let placeholder = match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        Some(("Loading branches...".to_string(), Color::DarkGray))
      }
      QueryState::Error(_) => Some((
        "An error occurred\n\nPress 'r' to retry.".to_string(),
        Color::Red,
      )),
      QueryState::Success(_) if len == 0 => Some(("No branches found.".to_string(), Color::DarkGray)),
      QueryState::Success(_) => None,
    };

    if let Some((text, color)) = placeholder {
      let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    let favorites = self.favorites.borrow();
    let rows: Vec<Row> = self
      .visible_rows()
      .into_iter()
      .map(|(serial, branch)| {
        let favorite = favorites.contains(&branch.ifsc);
        Row::new(vec![
          Span::raw(serial.to_string()),
          Span::styled(branch.ifsc.clone(), Style::default().fg(Color::Cyan)),
          Span::raw(truncate(&branch.branch, 40)),
          Span::raw(truncate(&branch.bank, 40)),
          Span::raw(branch.city.clone()),
          Span::styled(favorite_marker(favorite), Style::default().fg(Color::Yellow)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(7),
      Constraint::Length(12),
      Constraint::Fill(1),
      Constraint::Fill(1),
      Constraint::Length(16),
      Constraint::Length(4),
    ];

    let header = Row::new(vec!["Sr. No.", "IFSC", "Branch", "Bank", "City", "Fav"])
      .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

impl View for BranchListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Overlays take keys first
    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(value)) => {
        self.handle_picked(value);
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.picking = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        // Filtering never refetches, it only narrows the current page
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.next_page(),
      KeyCode::Char('p') | KeyCode::Left => self.prev_page(),
      KeyCode::Char('c') => self.open_city_picker(),
      KeyCode::Char('s') => self.open_page_size_picker(),
      KeyCode::Char('f') => self.toggle_favorite(),
      KeyCode::Char('r') => self.fetch(),
      KeyCode::Enter => {
        if let Some(ifsc) = self.selected_ifsc() {
          return ViewAction::Push(Box::new(BranchDetailView::new(
            ifsc,
            self.client.clone(),
            self.favorites.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Branches".to_string()
  }

  fn status(&self) -> Option<String> {
    if let Some(notice) = &self.notice {
      return Some(notice.clone());
    }
    let page = self.query.data()?;
    let pages = self.last_page(self.limit).map_or(1, |last| last + 1);
    Some(format!(
      "{}  page {}/{}  {} per page",
      range_label(self.offset(), page.items.len(), page.count),
      self.page + 1,
      pages,
      self.limit
    ))
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if let Some(page) = self.query.data() {
        self.total = Some(page.count);
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.search.is_active() || self.picker.is_active() {
      return vec![
        ShortcutInfo::new("enter", "apply").with_priority(10),
        ShortcutInfo::new("esc", "cancel").with_priority(20),
      ];
    }
    vec![
      ShortcutInfo::new("/", "filter").with_priority(10),
      ShortcutInfo::new("c", "city").with_priority(20),
      ShortcutInfo::new("s", "rows").with_priority(30),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("f", "favourite").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::branches::cached_client::testing::{branch, FakeApi};
  use crate::cache::{MemoryStorage, TtlCache};
  use crate::db::Database;
  use crate::favorites::Favorites;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;
  use std::rc::Rc;
  use std::sync::Arc;
  use std::time::Duration;
  use tempfile::TempDir;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn cities() -> Vec<String> {
    ["alwar", "jaipur", "mumbai", "delhi", "kolkata"]
      .iter()
      .map(|c| c.to_string())
      .collect()
  }

  /// `n` branches split between Jaipur and Delhi, IFSCs in order
  fn many(n: usize) -> Vec<Branch> {
    (0..n)
      .map(|i| {
        let city = if i % 2 == 0 { "Jaipur" } else { "Delhi" };
        branch(&format!("ABC{:04}", i), city)
      })
      .collect()
  }

  struct Harness {
    view: BranchListView,
    api: Arc<FakeApi>,
    favorites: SharedFavorites,
    _temp_dir: TempDir,
  }

  fn harness(branches: Vec<Branch>, limit: u32) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::with_branches(branches));
    let client = CachedBranchClient::new(api.clone(), TtlCache::new(MemoryStorage::new()));
    let db = Rc::new(Database::open_at(&temp_dir.path().join("state.db")).unwrap());
    let favorites = Favorites::load(db).shared();
    let view = BranchListView::new(client, favorites.clone(), cities(), limit);
    Harness {
      view,
      api,
      favorites,
      _temp_dir: temp_dir,
    }
  }

  impl Harness {
    async fn settle(&mut self) {
      tokio::time::sleep(Duration::from_millis(20)).await;
      self.view.tick();
    }

    fn press(&mut self, code: KeyCode) -> ViewAction {
      self.view.handle_key(key(code))
    }

    fn type_text(&mut self, text: &str) {
      for c in text.chars() {
        self.press(KeyCode::Char(c));
      }
    }

    fn serials(&self) -> Vec<u64> {
      self.view.visible_rows().iter().map(|(s, _)| *s).collect()
    }

    fn ifscs(&self) -> Vec<String> {
      self
        .view
        .visible_rows()
        .iter()
        .map(|(_, b)| b.ifsc.clone())
        .collect()
    }

    fn screen(&mut self) -> String {
      let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
      terminal
        .draw(|frame| {
          let area = frame.area();
          self.view.render(frame, area);
        })
        .unwrap();
      terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
    }
  }

  #[tokio::test]
  async fn test_initial_fetch_and_serials() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur"), branch("XYZ0002", "Delhi")], 30);

    h.settle().await;
    assert_eq!(h.api.last_query(), Some(ListQuery::new("", 30, 0)));
    assert_eq!(h.serials(), vec![1, 2]);
    assert_eq!(h.view.status().as_deref(), Some("1-2 of 2  page 1/1  30 per page"));
  }

  #[tokio::test]
  async fn test_page_size_change_keeps_offset_at_first_page() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur"), branch("XYZ0002", "Delhi")], 30);
    h.settle().await;

    // 30 -> 20 -> 10
    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Up);
    h.press(KeyCode::Up);
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.api.page_calls(), 2);
    assert_eq!(h.api.last_query(), Some(ListQuery::new("", 10, 0)));
    assert_eq!(h.serials(), vec![1, 2]);
  }

  #[tokio::test]
  async fn test_same_page_size_does_not_refetch() {
    let mut h = harness(many(3), 30);
    h.settle().await;

    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Enter);
    h.settle().await;
    assert_eq!(h.api.page_calls(), 1);
  }

  #[tokio::test]
  async fn test_paging_moves_offset() {
    let mut h = harness(many(25), 10);
    h.settle().await;

    h.press(KeyCode::Char('n'));
    h.settle().await;
    assert_eq!(h.api.last_query(), Some(ListQuery::new("", 10, 10)));
    assert_eq!(h.serials().first(), Some(&11));

    h.press(KeyCode::Right);
    h.settle().await;
    assert_eq!(h.serials(), vec![21, 22, 23, 24, 25]);

    // Already on the last page
    h.press(KeyCode::Char('n'));
    h.settle().await;
    assert_eq!(h.api.page_calls(), 3);

    // Back to a page that is still cached
    h.press(KeyCode::Char('p'));
    h.settle().await;
    assert_eq!(h.serials().first(), Some(&11));
    assert_eq!(h.api.page_calls(), 3);
  }

  #[tokio::test]
  async fn test_prev_on_first_page_is_noop() {
    let mut h = harness(many(5), 10);
    h.settle().await;

    h.press(KeyCode::Left);
    h.settle().await;
    assert_eq!(h.api.page_calls(), 1);
  }

  #[tokio::test]
  async fn test_page_size_change_keeps_page_index() {
    let mut h = harness(many(25), 10);
    h.settle().await;
    h.press(KeyCode::Char('n'));
    h.settle().await;

    // 10 -> 20 while on page 1
    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Down);
    h.press(KeyCode::Enter);
    h.settle().await;
    assert_eq!(h.api.last_query(), Some(ListQuery::new("", 20, 20)));

    // 20 -> 50 clamps to the only page
    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Down);
    h.press(KeyCode::Down);
    h.press(KeyCode::Enter);
    h.settle().await;
    assert_eq!(h.api.last_query(), Some(ListQuery::new("", 50, 0)));
  }

  #[tokio::test]
  async fn test_city_change_resets_page_and_filter() {
    let mut h = harness(many(25), 10);
    h.settle().await;
    h.press(KeyCode::Char('n'));
    h.settle().await;

    h.press(KeyCode::Char('/'));
    h.type_text("abc");
    h.press(KeyCode::Enter);
    assert_eq!(h.view.search.query(), "abc");

    // None, Alwar, Jaipur, Mumbai, Delhi
    h.press(KeyCode::Char('c'));
    for _ in 0..4 {
      h.press(KeyCode::Down);
    }
    h.press(KeyCode::Enter);
    assert_eq!(h.view.search.query(), "");

    h.settle().await;
    assert_eq!(h.api.last_query(), Some(ListQuery::new("delhi", 10, 0)));
    assert!(h.view.visible_rows().iter().all(|(_, b)| b.city == "Delhi"));
    assert_eq!(h.serials().first(), Some(&1));
  }

  #[tokio::test]
  async fn test_text_filter_narrows_without_fetching() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur"), branch("XYZ0002", "Delhi")], 30);
    h.settle().await;

    h.press(KeyCode::Char('/'));
    h.type_text("xyz");

    assert_eq!(h.ifscs(), vec!["XYZ0002"]);
    assert_eq!(h.serials(), vec![1]);
    assert_eq!(h.api.page_calls(), 1);

    // Escape drops the filter
    h.press(KeyCode::Esc);
    assert_eq!(h.ifscs().len(), 2);
  }

  #[tokio::test]
  async fn test_filter_keys_do_not_trigger_shortcuts() {
    let mut h = harness(many(25), 10);
    h.settle().await;

    h.press(KeyCode::Char('/'));
    h.type_text("nq");
    assert_eq!(h.api.page_calls(), 1);
    assert!(matches!(h.press(KeyCode::Char('q')), ViewAction::None));
  }

  #[tokio::test]
  async fn test_stale_page_is_discarded() {
    let mut h = harness(many(25), 10);
    h.settle().await;

    h.api.delay_offset(10, 100);
    h.press(KeyCode::Char('n')); // slow
    h.press(KeyCode::Char('p')); // fast

    h.settle().await;
    assert_eq!(h.serials().first(), Some(&1));

    tokio::time::sleep(Duration::from_millis(120)).await;
    h.view.tick();
    assert_eq!(h.serials().first(), Some(&1));
    assert_eq!(h.ifscs().first().map(String::as_str), Some("ABC0000"));
  }

  #[tokio::test]
  async fn test_error_state_and_retry() {
    let mut h = harness(many(3), 30);
    h.api.set_failing(true);
    h.press(KeyCode::Char('r'));
    h.settle().await;

    assert!(h.view.query.is_error());
    assert!(h.screen().contains("An error occurred"));

    h.api.set_failing(false);
    h.press(KeyCode::Char('r'));
    h.settle().await;
    assert_eq!(h.serials(), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_empty_page() {
    let mut h = harness(vec![], 30);
    h.settle().await;
    assert!(h.screen().contains("No branches found."));
    assert_eq!(h.view.status().as_deref(), Some("0 of 0  page 1/1  30 per page"));
  }

  #[tokio::test]
  async fn test_table_renders_rows() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur")], 30);
    h.favorites.borrow_mut().toggle("ABC0001").unwrap();
    h.settle().await;

    let screen = h.screen();
    assert!(screen.contains("Sr. No."));
    assert!(screen.contains("ABC0001"));
    assert!(screen.contains("★"));
  }

  #[tokio::test]
  async fn test_favorite_toggles_selected_row() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur"), branch("XYZ0002", "Delhi")], 30);
    h.settle().await;
    h.screen(); // selects the first row

    h.press(KeyCode::Down);
    h.press(KeyCode::Char('f'));
    assert_eq!(h.favorites.borrow().as_slice(), ["XYZ0002"]);

    h.press(KeyCode::Char('f'));
    assert!(h.favorites.borrow().as_slice().is_empty());
  }

  #[tokio::test]
  async fn test_enter_opens_detail() {
    let mut h = harness(vec![branch("ABC0001", "Jaipur")], 30);
    h.settle().await;
    h.screen();

    match h.press(KeyCode::Enter) {
      ViewAction::Push(view) => assert_eq!(view.breadcrumb_label(), "ABC0001"),
      _ => panic!("expected detail view"),
    }
  }

  #[tokio::test]
  async fn test_shortcuts_follow_open_overlay() {
    let mut h = harness(vec![], 30);
    assert_eq!(h.view.shortcuts().first().map(|s| s.key), Some("/"));

    h.press(KeyCode::Char('/'));
    let keys: Vec<&str> = h.view.shortcuts().iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["enter", "esc"]);

    h.press(KeyCode::Enter);
    h.press(KeyCode::Char('c'));
    assert_eq!(h.view.shortcuts().first().map(|s| s.key), Some("enter"));

    h.press(KeyCode::Esc);
    assert_eq!(h.view.shortcuts().first().map(|s| s.key), Some("/"));
  }

  #[tokio::test]
  async fn test_quit_pops() {
    let mut h = harness(vec![], 30);
    assert!(matches!(h.press(KeyCode::Char('q')), ViewAction::Pop));
  }

  #[test]
  fn test_capitalize() {
    assert_eq!(capitalize("jaipur"), "Jaipur");
    assert_eq!(capitalize(""), "");
  }
}

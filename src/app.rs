use crate::branches::CachedBranchClient;
use crate::event::{Event, EventHandler};
use crate::favorites::SharedFavorites;
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{BranchDetailView, BranchListView};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

/// Where the app opens: the listing (`/`) or one branch (`/IFSC`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Listing,
  Detail(String),
}

impl Route {
  pub fn parse(path: &str) -> Result<Self> {
    let rest = path
      .strip_prefix('/')
      .ok_or_else(|| eyre!("Route must start with '/': {}", path))?;

    if rest.is_empty() {
      return Ok(Route::Listing);
    }
    if rest.contains('/') || rest.chars().any(char::is_whitespace) {
      return Err(eyre!("Invalid branch id in route: {}", path));
    }
    Ok(Route::Detail(rest.to_string()))
  }

  /// Route for the `--branch` flag
  pub fn from_branch(branch: Option<&str>) -> Result<Self> {
    match branch {
      Some(ifsc) => Self::parse(&format!("/{}", ifsc.trim())),
      None => Ok(Route::Listing),
    }
  }
}

/// Everything the views need to fetch and bookmark branches
#[derive(Clone)]
pub struct AppContext {
  pub client: CachedBranchClient,
  pub favorites: SharedFavorites,
  pub cities: Vec<String>,
  pub page_size: u32,
  /// API host shown in the header
  pub host: String,
}

/// Main application state
pub struct App {
  /// Navigation stack - the listing is always at index 0
  view_stack: Vec<Box<dyn View>>,
  favorites: SharedFavorites,
  host: String,
  should_quit: bool,
}

impl App {
  /// Build the view stack for `route`. A detail route still has the
  /// listing underneath so going back lands somewhere useful.
  pub fn new(ctx: AppContext, route: Route) -> Self {
    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(BranchListView::new(
      ctx.client.clone(),
      ctx.favorites.clone(),
      ctx.cities,
      ctx.page_size,
    ))];

    if let Route::Detail(ifsc) = route {
      view_stack.push(Box::new(BranchDetailView::new(
        ifsc,
        ctx.client,
        ctx.favorites.clone(),
      )));
    }

    Self {
      view_stack,
      favorites: ctx.favorites,
      host: ctx.host,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));
    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => {
          tracing::warn!("event channel closed");
          break;
        }
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        tracing::debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  /// Poll every view so the listing keeps up while a detail view is open
  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn favorites_count(&self) -> usize {
    self.favorites.borrow().len()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn status(&self) -> Option<String> {
    self.view_stack.last().and_then(|v| v.status())
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  #[cfg(test)]
  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}

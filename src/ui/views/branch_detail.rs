use crate::branches::{Branch, CachedBranchClient};
use crate::error::BranchError;
use crate::favorites::SharedFavorites;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::favorite_marker;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for a single branch, opened from the listing or via `--branch`
pub struct BranchDetailView {
  ifsc: String,
  client: CachedBranchClient,
  favorites: SharedFavorites,
  query: Query<Branch, BranchError>,
  notice: Option<String>,
}

impl BranchDetailView {
  pub fn new(ifsc: String, client: CachedBranchClient, favorites: SharedFavorites) -> Self {
    let mut view = Self {
      ifsc,
      client,
      favorites,
      query: Query::new(),
      notice: None,
    };

    // Start fetching immediately
    view.fetch();
    view
  }

  fn fetch(&mut self) {
    let client = self.client.clone();
    let ifsc = self.ifsc.clone();
    tracing::debug!(ifsc = %ifsc, "fetching branch");
    self
      .query
      .run(async move { client.get_branch(&ifsc).await });
  }

  fn is_favorite(&self) -> bool {
    self.favorites.borrow().contains(&self.ifsc)
  }

  fn toggle_favorite(&mut self) {
    let result = self.favorites.borrow_mut().toggle(&self.ifsc);
    self.notice = match result {
      Ok(_) => None,
      Err(e) => {
        tracing::error!(ifsc = %self.ifsc, error = %e, "failed to save favorites");
        Some("Could not save favorites".to_string())
      }
    };
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let marker = favorite_marker(self.is_favorite());
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} {} (loading...) ", marker, self.ifsc),
      _ => format!(" {} {} ", marker, self.ifsc),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading branch details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let text = if error.is_not_found() {
        "Branch data unavailable".to_string()
      } else {
        "An error occurred\n\nPress 'r' to retry.".to_string()
      };
      let paragraph = Paragraph::new(text).style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let branch = match self.query.data() {
      Some(branch) => branch,
      None => return,
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2), // Branch name and favorite state
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Fields
      ])
      .split(inner);

    let heading = vec![
      Line::from(Span::styled(
        &branch.branch,
        Style::default().fg(Color::Yellow).bold(),
      )),
      Line::from(Span::styled(
        if self.is_favorite() {
          "★ Favourite"
        } else {
          "☆ Not a favourite"
        },
        Style::default().fg(Color::DarkGray),
      )),
    ];
    frame.render_widget(Paragraph::new(heading), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let fields = Paragraph::new(field_lines(branch)).wrap(Wrap { trim: true });
    frame.render_widget(fields, chunks[2]);
  }
}

fn field_lines(branch: &Branch) -> Vec<Line<'_>> {
  [
    ("City", &branch.city),
    ("IFSC", &branch.ifsc),
    ("Bank", &branch.bank),
    ("Address", &branch.address),
    ("District", &branch.district),
    ("State", &branch.state),
  ]
  .into_iter()
  .map(|(label, value)| {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
      Span::raw(value.as_str()),
    ])
  })
  .collect()
}

impl View for BranchDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('f') => {
        self.toggle_favorite();
        ViewAction::None
      }
      KeyCode::Char('r') => {
        self.fetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.ifsc.clone()
  }

  fn status(&self) -> Option<String> {
    self.notice.clone()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("f", "favourite").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

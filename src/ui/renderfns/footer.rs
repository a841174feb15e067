use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, view status on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&str>) {
  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(1), Constraint::Length(status_width(status))])
    .split(area);

  let line = Line::from(breadcrumb_spans(breadcrumb));
  frame.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    chunks[0],
  );

  if let Some(status) = status {
    let paragraph = Paragraph::new(format!("{} ", status))
      .alignment(Alignment::Right)
      .style(Style::default().bg(Color::Black).fg(Color::Yellow));
    frame.render_widget(paragraph, chunks[1]);
  }
}

fn status_width(status: Option<&str>) -> u16 {
  status.map_or(0, |s| s.chars().count() as u16 + 1)
}

fn breadcrumb_spans(breadcrumb: &[String]) -> Vec<Span<'static>> {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  spans
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_breadcrumb_separators() {
    let crumbs = vec!["Branches".to_string(), "ABC0001".to_string()];
    let text: String = breadcrumb_spans(&crumbs)
      .iter()
      .map(|s| s.content.as_ref())
      .collect();
    assert_eq!(text, " Branches > ABC0001");
  }

  #[test]
  fn test_status_width() {
    assert_eq!(status_width(None), 0);
    assert_eq!(status_width(Some("1-2 of 2")), 9);
  }
}

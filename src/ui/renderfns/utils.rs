/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// "21-30 of 120" style label for the rows of the current page
pub fn range_label(offset: u32, rows: usize, count: u64) -> String {
  if rows == 0 {
    return format!("0 of {}", count);
  }
  let first = u64::from(offset) + 1;
  let last = u64::from(offset) + rows as u64;
  format!("{}-{} of {}", first, last, count)
}

/// Marker shown next to favorite branches
pub fn favorite_marker(favorite: bool) -> &'static str {
  if favorite {
    "★"
  } else {
    "☆"
  }
}

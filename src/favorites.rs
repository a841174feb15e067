//! Favorite branches, persisted as a JSON array of IFSC codes.

use color_eyre::Result;
use std::cell::RefCell;
use std::rc::Rc;

use crate::db::Database;

/// Fixed storage key for the favorites array
pub const FAVORITES_KEY: &str = "favs";

/// Favorites shared by every view on the UI thread
pub type SharedFavorites = Rc<RefCell<Favorites>>;

/// Ordered set of favorite IFSC codes, written through on every change
pub struct Favorites {
  db: Rc<Database>,
  ifscs: Vec<String>,
}

impl Favorites {
  /// Read the persisted set. Missing or unreadable data starts empty.
  pub fn load(db: Rc<Database>) -> Self {
    let ifscs = match db.get(FAVORITES_KEY) {
      Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(list) => dedup(list),
        Err(e) => {
          tracing::warn!(error = %e, "ignoring malformed favorites");
          Vec::new()
        }
      },
      Ok(None) => Vec::new(),
      Err(e) => {
        tracing::warn!(error = %e, "failed to read favorites");
        Vec::new()
      }
    };

    tracing::debug!(count = ifscs.len(), "loaded favorites");
    Self { db, ifscs }
  }

  pub fn shared(self) -> SharedFavorites {
    Rc::new(RefCell::new(self))
  }

  pub fn contains(&self, ifsc: &str) -> bool {
    self.ifscs.iter().any(|f| f == ifsc)
  }

  pub fn len(&self) -> usize {
    self.ifscs.len()
  }

  #[cfg(test)]
  pub fn as_slice(&self) -> &[String] {
    &self.ifscs
  }

  /// Add `ifsc` if absent, remove it otherwise, then persist.
  ///
  /// Returns whether the branch is a favorite afterwards.
  pub fn toggle(&mut self, ifsc: &str) -> Result<bool> {
    let now_favorite = if self.contains(ifsc) {
      self.ifscs.retain(|f| f != ifsc);
      false
    } else {
      self.ifscs.push(ifsc.to_string());
      true
    };

    self.persist()?;
    tracing::info!(ifsc, favorite = now_favorite, "toggled favorite");
    Ok(now_favorite)
  }

  fn persist(&self) -> Result<()> {
    let raw = serde_json::to_string(&self.ifscs)?;
    self.db.set(FAVORITES_KEY, &raw)
  }
}

fn dedup(list: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(list.len());
  for ifsc in list {
    if !out.contains(&ifsc) {
      out.push(ifsc);
    }
  }
  out
}

//! Async query abstraction for view-level data fetching.
//!
//! A `Query<T, E>` tracks loading/success/error for one logical request slot
//! in a view. Each `run()` is tagged with an increasing sequence id; when
//! results are polled, only the one matching the latest id is applied, so a
//! slow earlier request can never overwrite the answer to a later one.
//!
//! # Example
//!
//! ```ignore
//! let client = cached_client.clone();
//! let mut query = Query::new();
//! query.run(async move { client.list_branches(&list_query).await });
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T, E = String> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(E),
}

impl<T, E> QueryState<T, E> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&E> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type Tagged<T, E> = (u64, Result<T, E>);

/// Async query with "last request wins" semantics.
pub struct Query<T, E = String> {
  state: QueryState<T, E>,
  latest: u64,
  tx: mpsc::UnboundedSender<Tagged<T, E>>,
  rx: mpsc::UnboundedReceiver<Tagged<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> Query<T, E> {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      state: QueryState::Idle,
      latest: 0,
      tx,
      rx,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T, E> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query failed.
  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error if the query failed.
  pub fn error(&self) -> Option<&E> {
    self.state.error()
  }

  /// Sequence id of the most recently issued request.
  #[cfg(test)]
  pub fn latest_seq(&self) -> u64 {
    self.latest
  }

  /// Issue a new request. Any request still in flight becomes stale.
  pub fn run<Fut>(&mut self, future: Fut) -> u64
  where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    self.latest += 1;
    let seq = self.latest;
    self.state = QueryState::Loading;

    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the query may have been dropped
      let _ = tx.send((seq, result));
    });

    seq
  }

  /// Apply any finished responses.
  ///
  /// Returns `true` if the state changed. Responses from superseded requests
  /// are dropped. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    while let Ok((seq, result)) = self.rx.try_recv() {
      if seq != self.latest {
        tracing::debug!(seq, latest = self.latest, "discarding stale response");
        continue;
      }

      self.state = match result {
        Ok(data) => QueryState::Success(data),
        Err(error) => QueryState::Error(error),
      };
      changed = true;
    }

    changed
  }
}

impl<T: Send + 'static, E: Send + 'static> Default for Query<T, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> std::fmt::Debug for Query<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("latest", &self.latest)
      .finish_non_exhaustive()
  }
}

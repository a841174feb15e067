use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use super::api_types::{decode_branch, decode_page};
use super::types::{Branch, BranchPage, ListQuery};
use crate::config::Config;
use crate::error::{BranchError, Result};

/// Transport seam for the branch lookup service.
///
/// Futures are boxed and `'static` so callers can hand them straight to
/// `tokio::spawn`.
pub trait BranchApi: Send + Sync {
  /// `GET {base}/branches?q=&limit=&offset=`
  fn fetch_page(&self, query: &ListQuery) -> BoxFuture<'static, Result<BranchPage>>;

  /// `GET {base}/branches/{ifsc}`
  fn fetch_branch(&self, ifsc: &str) -> BoxFuture<'static, Result<Branch>>;
}

/// HTTP client for the branch REST API
#[derive(Clone)]
pub struct BranchClient {
  client: Client,
  base_url: Url,
}

impl BranchClient {
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    Self::with_base_url(&config.api.base_url, config.api.timeout_secs)
  }

  pub fn with_base_url(base_url: &str, timeout_secs: Option<u64>) -> color_eyre::Result<Self> {
    use color_eyre::eyre::eyre;

    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL {}: {}", base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API base URL {} cannot carry a path", base_url));
    }

    let mut builder = Client::builder().user_agent(concat!("branches-tui/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  /// Host shown in the header bar
  pub fn host(&self) -> &str {
    self.base_url.host_str().unwrap_or("")
  }

  /// Build `{base}/{segments...}`.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // Checked in the constructor
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  pub fn list_url(&self, query: &ListQuery) -> Url {
    let mut url = self.endpoint(&["branches"]);
    url
      .query_pairs_mut()
      .append_pair("q", &query.q)
      .append_pair("limit", &query.limit.to_string())
      .append_pair("offset", &query.offset.to_string());
    url
  }

  pub fn branch_url(&self, ifsc: &str) -> Url {
    self.endpoint(&["branches", ifsc])
  }

  async fn get(client: Client, url: Url) -> Result<(StatusCode, Vec<u8>)> {
    tracing::debug!(%url, "GET");
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    tracing::debug!(%url, %status, bytes = body.len(), "response");
    Ok((status, body.to_vec()))
  }
}

impl BranchApi for BranchClient {
  fn fetch_page(&self, query: &ListQuery) -> BoxFuture<'static, Result<BranchPage>> {
    let client = self.client.clone();
    let url = self.list_url(query);
    let limit = query.limit;

    Box::pin(async move {
      let (status, body) = Self::get(client, url.clone()).await?;
      if !status.is_success() {
        return Err(BranchError::Network(format!("HTTP {} from {}", status, url)));
      }
      decode_page(&body, limit)
    })
  }

  fn fetch_branch(&self, ifsc: &str) -> BoxFuture<'static, Result<Branch>> {
    let client = self.client.clone();
    let url = self.branch_url(ifsc);
    let ifsc = ifsc.to_string();

    Box::pin(async move {
      let (status, body) = Self::get(client, url.clone()).await?;
      match status {
        StatusCode::NOT_FOUND => Err(BranchError::NotFound(ifsc)),
        s if s.is_success() => decode_branch(&body),
        s => Err(BranchError::Network(format!("HTTP {} from {}", s, url))),
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;
  use tokio::sync::oneshot;

  /// Serve exactly one HTTP response and report the request line.
  async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut request = Vec::new();
      let mut buf = [0u8; 1024];
      loop {
        let n = socket.read(&mut buf).await.unwrap();
        request.extend_from_slice(&buf[..n]);
        if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
          break;
        }
      }
      let request = String::from_utf8_lossy(&request);
      let request_line = request.lines().next().unwrap_or_default().to_string();
      let _ = tx.send(request_line);

      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      socket.shutdown().await.unwrap();
    });

    (format!("http://{}/api", addr), rx)
  }

  const BRANCH_JSON: &str = r#"{"ifsc":"ABC0001","bank":"ABC BANK","branch":"MI ROAD","address":"MI ROAD, JAIPUR","city":"JAIPUR","district":"JAIPUR","state":"RAJASTHAN"}"#;

  #[test]
  fn test_list_url_encodes_params() {
    let client = BranchClient::with_base_url("https://example.com/api/", None).unwrap();
    let url = client.list_url(&ListQuery::new("new delhi", 10, 20));
    assert_eq!(
      url.as_str(),
      "https://example.com/api/branches?q=new+delhi&limit=10&offset=20"
    );
  }

  #[test]
  fn test_branch_url() {
    let client = BranchClient::with_base_url("https://example.com/api", None).unwrap();
    assert_eq!(
      client.branch_url("ABC0001").as_str(),
      "https://example.com/api/branches/ABC0001"
    );
  }

  #[test]
  fn test_rejects_non_base_url() {
    assert!(BranchClient::with_base_url("mailto:someone@example.com", None).is_err());
  }

  #[tokio::test]
  async fn test_fetch_page_ok() {
    let body = format!(r#"{{"count":1,"results":[{}]}}"#, BRANCH_JSON);
    let (base, request) = serve_once("200 OK", body).await;
    let client = BranchClient::with_base_url(&base, Some(5)).unwrap();

    let page = client
      .fetch_page(&ListQuery::new("jaipur", 30, 0))
      .await
      .unwrap();

    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].ifsc, "ABC0001");
    assert_eq!(
      request.await.unwrap(),
      "GET /api/branches?q=jaipur&limit=30&offset=0 HTTP/1.1"
    );
  }

  #[tokio::test]
  async fn test_fetch_page_server_error_is_network_error() {
    let (base, _request) = serve_once("500 Internal Server Error", String::new()).await;
    let client = BranchClient::with_base_url(&base, Some(5)).unwrap();

    let err = client
      .fetch_page(&ListQuery::new("", 30, 0))
      .await
      .unwrap_err();
    assert!(matches!(err, BranchError::Network(_)));
  }

  #[tokio::test]
  async fn test_fetch_branch_not_found() {
    let (base, _request) = serve_once("404 Not Found", r#"{"detail":"Not found."}"#.into()).await;
    let client = BranchClient::with_base_url(&base, Some(5)).unwrap();

    let err = client.fetch_branch("NOPE0000").await.unwrap_err();
    assert_eq!(err, BranchError::NotFound("NOPE0000".to_string()));
  }

  #[tokio::test]
  async fn test_fetch_branch_malformed_body() {
    let (base, _request) = serve_once("200 OK", "[1, 2, 3]".into()).await;
    let client = BranchClient::with_base_url(&base, Some(5)).unwrap();

    let err = client.fetch_branch("ABC0001").await.unwrap_err();
    assert!(matches!(err, BranchError::Deserialization(_)));
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BranchClient::with_base_url(&format!("http://{}/api", addr), Some(5)).unwrap();
    let err = client.fetch_branch("ABC0001").await.unwrap_err();
    assert!(matches!(err, BranchError::Network(_)));
  }
}

//! HTTP client for an external advisory service.
//!
//! The service receives the node's [`AdvisoryContext`] as a JSON `POST` body
//! and answers with an [`Advice`] object:
//!
//! ```json
//! { "decision": "MERGE", "reason": "duplicates Limits (calculus)" }
//! ```

use std::time::Duration;

use lattice_core::advisory::{Advice, Advisor, AdvisoryContext, AdvisoryError};
use serde::Deserialize;

/// `[advisory]` section of the server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AdvisoryConfig {
  pub url:          String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 10 }

/// An [`Advisor`] that asks a remote service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAdvisor {
  client: reqwest::Client,
  url:    String,
}

impl HttpAdvisor {
  pub fn new(config: &AdvisoryConfig) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, url: config.url.clone() })
  }
}

impl Advisor for HttpAdvisor {
  async fn recommend(&self, context: AdvisoryContext) -> Result<Advice, AdvisoryError> {
    let response = self
      .client
      .post(&self.url)
      .json(&context)
      .send()
      .await
      .map_err(|e| AdvisoryError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(AdvisoryError::Transport(format!("advisory service returned {status}")));
    }

    response
      .json::<Advice>()
      .await
      .map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use axum::{Json, Router, routing::post};
  use lattice_core::{lifecycle::ReviewDecision, prerequisite::Prerequisite};
  use serde_json::json;
  use tokio::net::TcpListener;

  use super::*;

  fn context() -> AdvisoryContext {
    AdvisoryContext {
      prerequisite: Prerequisite::new("Limits"),
      concepts:     vec![],
      edges:        vec![],
    }
  }

  fn advisor(url: String) -> HttpAdvisor {
    HttpAdvisor::new(&AdvisoryConfig { url, timeout_secs: 2 }).unwrap()
  }

  /// Serve `app` on an ephemeral local port and return its advise URL.
  async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/advise")
  }

  #[tokio::test]
  async fn dropped_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      while let Ok((stream, _)) = listener.accept().await {
        drop(stream);
      }
    });

    let err = advisor(format!("http://{addr}/advise")).recommend(context()).await.unwrap_err();
    assert!(matches!(err, AdvisoryError::Transport(_)), "{err:?}");
  }

  #[tokio::test]
  async fn error_status_is_a_transport_error() {
    let app = Router::new().route(
      "/advise",
      post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy") }),
    );
    let err = advisor(serve(app).await).recommend(context()).await.unwrap_err();
    match err {
      AdvisoryError::Transport(msg) => assert!(msg.contains("503"), "{msg}"),
      other => panic!("expected transport error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn non_json_reply_is_an_invalid_response() {
    let app = Router::new().route("/advise", post(|| async { "merge it" }));
    let err = advisor(serve(app).await).recommend(context()).await.unwrap_err();
    assert!(matches!(err, AdvisoryError::InvalidResponse(_)), "{err:?}");
  }

  #[tokio::test]
  async fn advice_is_decoded_from_the_reply() {
    let app = Router::new().route(
      "/advise",
      post(|Json(body): Json<serde_json::Value>| async move {
        assert_eq!(body["prerequisite"]["name"], "Limits");
        Json(json!({ "decision": "MERGE", "reason": "duplicates Limits (calculus)" }))
      }),
    );
    let advice = advisor(serve(app).await).recommend(context()).await.unwrap();
    assert_eq!(advice.decision, ReviewDecision::Merge);
    assert_eq!(advice.reason, "duplicates Limits (calculus)");
  }

  #[test]
  fn timeout_defaults_when_omitted() {
    let cfg: AdvisoryConfig =
      serde_json::from_str(r#"{"url":"http://advisor.local/advise"}"#).unwrap();
    assert_eq!(cfg.timeout_secs, 10);
  }
}

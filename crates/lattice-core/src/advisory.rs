//! The advisory collaborator: suggests a review decision for a node.
//!
//! Advice is only ever surfaced to the admin. Nothing in this crate applies
//! it, and a failing advisor never blocks the manual actions.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  concept::Concept,
  lifecycle::ReviewDecision,
  prerequisite::Prerequisite,
  strength::Strength,
};

/// One topic the node is linked to, as shown to the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeContext {
  pub topic_id:   Uuid,
  pub topic_name: String,
  pub frequency:  u32,
  pub strength:   Strength,
}

/// Everything the advisor gets to see about a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryContext {
  pub prerequisite: Prerequisite,
  pub concepts:     Vec<Concept>,
  pub edges:        Vec<EdgeContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
  pub decision: ReviewDecision,
  pub reason:   String,
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
  #[error("no advisory service is configured")]
  Unavailable,

  #[error("advisory request failed: {0}")]
  Transport(String),

  #[error("advisory response was not understood: {0}")]
  InvalidResponse(String),
}

pub trait Advisor: Send + Sync {
  fn recommend(
    &self,
    context: AdvisoryContext,
  ) -> impl Future<Output = Result<Advice, AdvisoryError>> + Send + '_;
}

/// An absent advisor is always unavailable.
impl<A: Advisor> Advisor for Option<A> {
  async fn recommend(&self, context: AdvisoryContext) -> Result<Advice, AdvisoryError> {
    match self {
      Some(advisor) => advisor.recommend(context).await,
      None => Err(AdvisoryError::Unavailable),
    }
  }
}

//! Pipeline session and orchestration.
//!
//! Stages are pure functions of their inputs; the session owns the three
//! output collections and the orchestrator here is their only writer.
//! Re-running an upstream stage clears downstream outputs, so the session
//! never shows an evaluation of ideas that no longer exist.

pub mod brief;
pub mod evaluate;
pub mod generate;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::brief::IdeaBrief;
use crate::cache::CallCache;
use crate::gateway::{Attribution, ChatGateway, ChatModel};
use crate::idea::{select_by_titles, Idea, RefinedIdea};

pub use brief::{BriefError, BriefFailure, BriefOutcome};
pub use evaluate::EvaluateError;
pub use generate::{GenerationFailure, GenerationOutcome};

/// Default number of refined ideas to keep, from the editorial "pick the 20
/// best" workflow this pipeline grew out of.
pub const DEFAULT_EVALUATION_LIMIT: usize = 20;

// =============================================================================
// Parameters
// =============================================================================

/// User-supplied session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    /// Topic for idea generation.
    pub topic: String,
    /// Number of ideas to brainstorm.
    #[serde(default = "default_idea_count")]
    pub idea_count: u32,
    /// Sampling temperature for generation (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// How many ideas the evaluation stage processes.
    #[serde(default = "default_evaluation_limit")]
    pub evaluation_limit: usize,
    /// Brainstorming model.
    #[serde(default = "default_brainstorm_model")]
    pub brainstorm_model: ChatModel,
    /// Evaluation and brief-enhancement model.
    #[serde(default = "default_refine_model")]
    pub refine_model: ChatModel,
    /// Structured-repair model.
    #[serde(default = "default_repair_model")]
    pub repair_model: ChatModel,
}

fn default_idea_count() -> u32 {
    10
}
fn default_temperature() -> f32 {
    0.7
}
fn default_evaluation_limit() -> usize {
    DEFAULT_EVALUATION_LIMIT
}
fn default_brainstorm_model() -> ChatModel {
    ChatModel::openai("gpt-4o-mini")
}
fn default_refine_model() -> ChatModel {
    ChatModel::anthropic("claude-3-5-haiku-20241022")
}
fn default_repair_model() -> ChatModel {
    ChatModel::openai("gpt-4-turbo")
}

impl SessionParams {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            idea_count: default_idea_count(),
            temperature: default_temperature(),
            evaluation_limit: default_evaluation_limit(),
            brainstorm_model: default_brainstorm_model(),
            refine_model: default_refine_model(),
            repair_model: default_repair_model(),
        }
    }

    /// Check preconditions before any network call is made.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if self.idea_count == 0 {
            return Err(ValidationError::ZeroCount);
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureRange(self.temperature));
        }
        Ok(())
    }
}

/// User input violated a precondition; rejected before any network call.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("idea count must be at least 1")]
    ZeroCount,
    #[error("temperature {0} outside [0, 1]")]
    TemperatureRange(f32),
    #[error("selection matched no refined ideas")]
    EmptySelection,
}

// =============================================================================
// Session
// =============================================================================

/// Transient state for one pipeline run.
///
/// The collections are written once per stage run by the orchestrator; the
/// setters clear downstream outputs so stale data cannot survive an upstream
/// re-run.
#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub params: SessionParams,
    ideas: Vec<Idea>,
    refined_ideas: Vec<RefinedIdea>,
    briefs: Vec<IdeaBrief>,
}

impl PipelineSession {
    pub fn new(params: SessionParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            params,
            ideas: Vec::new(),
            refined_ideas: Vec::new(),
            briefs: Vec::new(),
        }
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn refined_ideas(&self) -> &[RefinedIdea] {
        &self.refined_ideas
    }

    pub fn briefs(&self) -> &[IdeaBrief] {
        &self.briefs
    }

    fn set_ideas(&mut self, ideas: Vec<Idea>) {
        self.ideas = ideas;
        self.refined_ideas.clear();
        self.briefs.clear();
    }

    fn set_refined_ideas(&mut self, refined: Vec<RefinedIdea>) {
        self.refined_ideas = refined;
        self.briefs.clear();
    }

    fn set_briefs(&mut self, briefs: Vec<IdeaBrief>) {
        self.briefs = briefs;
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("all {count} generation requests failed: {first}")]
    AllGenerationsFailed { count: u32, first: String },
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluateError),
    #[error("no generated ideas in session; run generation first")]
    NoIdeas,
    #[error("no refined ideas in session; run evaluation first")]
    NoRefinedIdeas,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// The orchestration layer: owns the gateway and cache, drives the stages,
/// and is the only writer of session state.
pub struct Pipeline {
    gateway: Arc<dyn ChatGateway>,
    cache: Option<Arc<dyn CallCache>>,
}

impl Pipeline {
    pub fn new(gateway: Arc<dyn ChatGateway>, cache: Option<Arc<dyn CallCache>>) -> Self {
        Self { gateway, cache }
    }

    fn cache_ref(&self) -> Option<&dyn CallCache> {
        self.cache.as_deref()
    }

    /// Run the generation stage and store its ideas in the session.
    ///
    /// Per-item failures are returned for reporting; only a fan-out in which
    /// every request failed is an error.
    pub async fn run_generation(
        &self,
        session: &mut PipelineSession,
    ) -> Result<Vec<GenerationFailure>, PipelineError> {
        session.params.validate()?;

        let attribution = Attribution::new("pipeline::generate").with_session(session.id);
        let outcome = generate::generate(
            self.gateway.as_ref(),
            self.cache_ref(),
            &session.params.topic,
            session.params.idea_count,
            session.params.temperature,
            &session.params.brainstorm_model,
            &attribution,
        )
        .await;

        if outcome.ideas.is_empty() {
            let first = outcome
                .failures
                .first()
                .map(|f| f.error.to_string())
                .unwrap_or_else(|| "no requests dispatched".to_string());
            return Err(PipelineError::AllGenerationsFailed {
                count: session.params.idea_count,
                first,
            });
        }

        session.set_ideas(outcome.ideas);
        Ok(outcome.failures)
    }

    /// Run the evaluation stage over the session's ideas.
    pub async fn run_evaluation(
        &self,
        session: &mut PipelineSession,
    ) -> Result<(), PipelineError> {
        if session.ideas.is_empty() {
            return Err(PipelineError::NoIdeas);
        }

        let attribution = Attribution::new("pipeline::evaluate").with_session(session.id);
        let refined = evaluate::evaluate(
            self.gateway.as_ref(),
            self.cache_ref(),
            &session.ideas,
            session.params.evaluation_limit,
            &session.params.refine_model,
            &attribution,
        )
        .await?;

        session.set_refined_ideas(refined);
        Ok(())
    }

    /// Run the repair-and-parse stage over the refined ideas whose display
    /// titles appear in `selected_titles`.
    ///
    /// Stores the successfully parsed briefs and returns the per-item
    /// failures for reporting.
    pub async fn run_briefs(
        &self,
        session: &mut PipelineSession,
        selected_titles: &[String],
    ) -> Result<Vec<BriefFailure>, PipelineError> {
        if session.refined_ideas.is_empty() {
            return Err(PipelineError::NoRefinedIdeas);
        }

        let selected = select_by_titles(&session.refined_ideas, selected_titles);
        if selected.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let attribution = Attribution::new("pipeline::brief").with_session(session.id);
        let outcome = brief::brief_all(
            self.gateway.as_ref(),
            self.cache_ref(),
            &selected,
            &session.params.refine_model,
            &session.params.repair_model,
            &attribution,
        )
        .await;

        session.set_briefs(outcome.briefs);
        Ok(outcome.failures)
    }
}

//! Repair-and-parse stage — turn selected refined ideas into IdeaBriefs.
//!
//! Per idea: enhancement call → strict parse → on failure, exactly one
//! repair call carrying the literal expected schema → re-parse → permanent
//! parse error. Fanned out with the same per-item isolation as generation:
//! one idea's parse failure never discards its siblings' briefs.

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::brief::{parse_brief, BriefParseError, IdeaBrief};
use crate::cache::{get_or_compute, CallCache, CallCacheKey};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError};
use crate::idea::RefinedIdea;
use crate::prompts::{brief_messages, repair_messages};

/// Worker pool bound for the brief fan-out.
pub const BRIEF_CONCURRENCY: usize = 4;

/// Generation cap per brief and per repair.
pub const MAX_BRIEF_TOKENS: u32 = 4_000;

const BRIEF_TEMPERATURE: f32 = 0.2;
const REPAIR_TEMPERATURE: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum BriefError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
    /// Permanent: parsing failed on both the enhanced text and the repaired
    /// text. Not retried automatically.
    #[error("structured parse failed after repair: {0}")]
    Parse(#[from] BriefParseError),
}

/// One idea that could not be turned into a brief.
#[derive(Debug)]
pub struct BriefFailure {
    /// Index within the selected batch.
    pub index: usize,
    /// Display title of the refined idea, for reporting.
    pub title: String,
    pub error: BriefError,
}

/// Partial-success outcome of a brief fan-out.
#[derive(Debug, Default)]
pub struct BriefOutcome {
    pub briefs: Vec<IdeaBrief>,
    pub failures: Vec<BriefFailure>,
}

/// Enhance one refined idea and parse it into an `IdeaBrief`.
pub async fn to_brief(
    gateway: &dyn ChatGateway,
    cache: Option<&dyn CallCache>,
    refined: &RefinedIdea,
    refine_model: &ChatModel,
    repair_model: &ChatModel,
    attribution: &Attribution,
) -> Result<IdeaBrief, BriefError> {
    let enhanced = call_stage(
        gateway,
        cache,
        "brief",
        refine_model,
        brief_messages(refined.text()),
        BRIEF_TEMPERATURE,
        attribution,
    )
    .await?;

    let parse_error = match parse_brief(&enhanced) {
        Ok(brief) => return Ok(brief),
        Err(e) => e,
    };
    warn!(
        error = %parse_error,
        title = %refined.display_title(),
        "enhanced brief failed strict parse; invoking repair call"
    );

    let repaired = call_stage(
        gateway,
        cache,
        "repair",
        repair_model,
        repair_messages(&enhanced),
        REPAIR_TEMPERATURE,
        attribution,
    )
    .await?;

    // One repair attempt only; a second failure is permanent for this idea.
    parse_brief(&repaired).map_err(BriefError::from)
}

/// Fan `to_brief` out over the selected ideas with per-item isolation.
pub async fn brief_all(
    gateway: &dyn ChatGateway,
    cache: Option<&dyn CallCache>,
    selected: &[RefinedIdea],
    refine_model: &ChatModel,
    repair_model: &ChatModel,
    attribution: &Attribution,
) -> BriefOutcome {
    let tasks = selected.iter().enumerate().map(|(index, refined)| async move {
        let result = to_brief(gateway, cache, refined, refine_model, repair_model, attribution).await;
        (index, refined.display_title().to_string(), result)
    });

    let mut settled: Vec<(usize, String, Result<IdeaBrief, BriefError>)> = stream::iter(tasks)
        .buffer_unordered(BRIEF_CONCURRENCY)
        .collect()
        .await;
    settled.sort_by_key(|(index, _, _)| *index);

    let mut outcome = BriefOutcome::default();
    for (index, title, result) in settled {
        match result {
            Ok(brief) => outcome.briefs.push(brief),
            Err(error) => outcome.failures.push(BriefFailure { index, title, error }),
        }
    }
    outcome
}

async fn call_stage(
    gateway: &dyn ChatGateway,
    cache: Option<&dyn CallCache>,
    stage: &str,
    model: &ChatModel,
    messages: Vec<Message>,
    temperature: f32,
    attribution: &Attribution,
) -> Result<String, ProviderError> {
    let (system, user) = match messages.as_slice() {
        [system, user] => (system.content.as_str(), user.content.as_str()),
        [user] => ("", user.content.as_str()),
        _ => ("", ""),
    };
    let key = CallCacheKey::new(
        stage,
        model.model_id(),
        system,
        user,
        temperature,
        Some(MAX_BRIEF_TOKENS),
        1,
        0,
    );
    let req = ChatRequest::new(model.clone(), messages, attribution.clone())
        .temperature(temperature)
        .max_tokens(MAX_BRIEF_TOKENS);

    let texts = get_or_compute(cache, &key, || async {
        gateway.chat(req).await.map(|resp| resp.texts)
    })
    .await?;

    Ok(texts.into_iter().next().unwrap_or_default())
}

//! Evaluation stage — enhance each idea into five labeled sections.
//!
//! One independent call per idea, dispatched through a bounded pool and
//! reassembled by originating index: output order equals input order no
//! matter which calls finish first. Downstream title-based selection depends
//! on that correspondence, so it is a correctness requirement here.
//!
//! Unlike generation, a single failed call fails the whole batch — a partial
//! evaluation cannot be cross-referenced against the idea list the user saw.

use futures::stream::{self, StreamExt};

use crate::cache::{get_or_compute, CallCache, CallCacheKey};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::idea::{Idea, RefinedIdea};
use crate::prompts::evaluation_messages;

/// Worker pool bound for the evaluation fan-out.
pub const EVALUATION_CONCURRENCY: usize = 4;

/// Generation cap per refined idea.
pub const MAX_REFINED_TOKENS: u32 = 4_000;

const EVALUATION_TEMPERATURE: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
#[error("evaluation of idea {index} failed: {source}")]
pub struct EvaluateError {
    /// Input index of the idea whose call failed (lowest such index).
    pub index: usize,
    #[source]
    pub source: ProviderError,
}

/// Evaluate the first `limit` ideas (all if `limit` covers the slice).
pub async fn evaluate(
    gateway: &dyn ChatGateway,
    cache: Option<&dyn CallCache>,
    ideas: &[Idea],
    limit: usize,
    model: &ChatModel,
    attribution: &Attribution,
) -> Result<Vec<RefinedIdea>, EvaluateError> {
    let batch = &ideas[..limit.min(ideas.len())];

    let tasks = batch.iter().enumerate().map(|(index, idea)| {
        let messages = evaluation_messages(idea.text());
        let key = CallCacheKey::new(
            "evaluate",
            model.model_id(),
            &messages[0].content,
            &messages[1].content,
            EVALUATION_TEMPERATURE,
            Some(MAX_REFINED_TOKENS),
            1,
            0,
        );
        let req = ChatRequest::new(model.clone(), messages, attribution.clone())
            .temperature(EVALUATION_TEMPERATURE)
            .max_tokens(MAX_REFINED_TOKENS);

        async move {
            let result = get_or_compute(cache, &key, || async {
                gateway.chat(req).await.map(|resp| resp.texts)
            })
            .await;
            (index, result)
        }
    });

    // The barrier: every dispatched call settles before we inspect anything.
    let settled: Vec<(usize, Result<Vec<String>, ProviderError>)> = stream::iter(tasks)
        .buffer_unordered(EVALUATION_CONCURRENCY)
        .collect()
        .await;

    let mut slots: Vec<Option<RefinedIdea>> = (0..batch.len()).map(|_| None).collect();
    let mut first_failure: Option<(usize, ProviderError)> = None;

    for (index, result) in settled {
        match result {
            Ok(texts) => {
                let text = texts.into_iter().next().unwrap_or_default();
                slots[index] = Some(RefinedIdea::new(text.trim().to_string()));
            }
            Err(error) => {
                if first_failure.as_ref().map_or(true, |(i, _)| index < *i) {
                    first_failure = Some((index, error));
                }
            }
        }
    }

    if let Some((index, source)) = first_failure {
        return Err(EvaluateError { index, source });
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChatResponse, FinishReason};
    use std::time::Duration;

    /// Stub gateway that delays responses whose prompt mentions a marker,
    /// so completion order differs from dispatch order.
    struct SlowMiddleGateway;

    #[async_trait::async_trait]
    impl ChatGateway for SlowMiddleGateway {
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
            let user = &req.messages[1].content;
            let title = if user.contains("alpha") {
                "A"
            } else if user.contains("bravo") {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "B"
            } else {
                "C"
            };
            Ok(ChatResponse {
                texts: vec![format!(
                    "Title: {title}\nDescription: d\nJustification: j\nMethodology: m\nDatasets/Sources: s"
                )],
                input_tokens: 5,
                output_tokens: 10,
                cost_nanodollars: 0,
                latency: Duration::from_millis(1),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[tokio::test]
    async fn preserves_input_order_despite_completion_order() {
        let ideas = vec![
            Idea::new("Title: alpha"),
            Idea::new("Title: bravo"),
            Idea::new("Title: charlie"),
        ];
        let refined = evaluate(
            &SlowMiddleGateway,
            None,
            &ideas,
            10,
            &ChatModel::anthropic("claude-3-haiku-20240307"),
            &Attribution::new("test"),
        )
        .await
        .unwrap();

        let titles: Vec<&str> = refined.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    struct FailSecondGateway;

    #[async_trait::async_trait]
    impl ChatGateway for FailSecondGateway {
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
            if req.messages[1].content.contains("bravo") {
                return Err(ProviderError::provider("anthropic", "overloaded", true));
            }
            Ok(ChatResponse {
                texts: vec!["Title: ok".to_string()],
                input_tokens: 1,
                output_tokens: 1,
                cost_nanodollars: 0,
                latency: Duration::from_millis(1),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[tokio::test]
    async fn any_failure_fails_the_batch() {
        let ideas = vec![
            Idea::new("Title: alpha"),
            Idea::new("Title: bravo"),
            Idea::new("Title: charlie"),
        ];
        let err = evaluate(
            &FailSecondGateway,
            None,
            &ideas,
            10,
            &ChatModel::anthropic("claude-3-haiku-20240307"),
            &Attribution::new("test"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[tokio::test]
    async fn limit_truncates_the_batch() {
        let ideas = vec![
            Idea::new("Title: alpha"),
            Idea::new("Title: bravo"),
            Idea::new("Title: charlie"),
        ];
        let refined = evaluate(
            &SlowMiddleGateway,
            None,
            &ideas,
            2,
            &ChatModel::anthropic("claude-3-haiku-20240307"),
            &Attribution::new("test"),
        )
        .await
        .unwrap();
        assert_eq!(refined.len(), 2);
    }
}

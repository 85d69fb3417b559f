//! Generation stage — concurrent fan-out of single-idea requests.
//!
//! One request per idea, so a failed request costs one idea, not the batch.
//! Each in-flight request is tagged with its ordinal; results are reassembled
//! by ordinal, never by completion order. The ordinal also participates in
//! the cache key, keeping the sibling requests of one fan-out distinct.

use futures::stream::{self, StreamExt};

use crate::cache::{get_or_compute, CallCache, CallCacheKey};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::idea::Idea;
use crate::prompts::generation_messages;

/// Worker pool bound for the generation fan-out.
pub const GENERATION_CONCURRENCY: usize = 8;

/// Generation cap per idea.
pub const MAX_IDEA_TOKENS: u32 = 400;

/// One failed single-idea request.
#[derive(Debug)]
pub struct GenerationFailure {
    /// Ordinal of the failed request within the fan-out.
    pub ordinal: u32,
    pub error: ProviderError,
}

/// Partial-success outcome: up to `count` ideas plus the individual failures.
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    pub ideas: Vec<Idea>,
    pub failures: Vec<GenerationFailure>,
}

/// Brainstorm `count` ideas for `topic` with per-idea failure isolation.
pub async fn generate(
    gateway: &dyn ChatGateway,
    cache: Option<&dyn CallCache>,
    topic: &str,
    count: u32,
    temperature: f32,
    model: &ChatModel,
    attribution: &Attribution,
) -> GenerationOutcome {
    let tasks = (0..count).map(|ordinal| {
        let messages = generation_messages(topic);
        let key = CallCacheKey::new(
            "generate",
            model.model_id(),
            &messages[0].content,
            &messages[1].content,
            temperature,
            Some(MAX_IDEA_TOKENS),
            1,
            ordinal,
        );
        let req = ChatRequest::new(model.clone(), messages, attribution.clone())
            .temperature(temperature)
            .max_tokens(MAX_IDEA_TOKENS);
        let provider = model.provider();

        async move {
            let result = get_or_compute(cache, &key, || async {
                gateway.chat(req).await.map(|resp| resp.texts)
            })
            .await;

            let result = result.and_then(|texts| {
                let text = texts.into_iter().next().unwrap_or_default();
                if text.trim().is_empty() {
                    Err(ProviderError::provider(provider, "empty completion", false))
                } else {
                    Ok(text.trim().to_string())
                }
            });

            (ordinal, result)
        }
    });

    let mut settled: Vec<(u32, Result<String, ProviderError>)> = stream::iter(tasks)
        .buffer_unordered(GENERATION_CONCURRENCY)
        .collect()
        .await;
    settled.sort_by_key(|(ordinal, _)| *ordinal);

    let mut outcome = GenerationOutcome::default();
    for (ordinal, result) in settled {
        match result {
            Ok(text) => outcome.ideas.push(Idea::new(text)),
            Err(error) => outcome.failures.push(GenerationFailure { ordinal, error }),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChatResponse, FinishReason};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Stub gateway that fails every request whose arrival ordinal is listed.
    struct FlakyGateway {
        calls: AtomicU32,
        fail_on: Vec<u32>,
    }

    #[async_trait::async_trait]
    impl ChatGateway for FlakyGateway {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(ProviderError::provider("openai", "simulated outage", true));
            }
            Ok(ChatResponse {
                texts: vec![format!("Title: Idea {n}\nA short description.")],
                input_tokens: 5,
                output_tokens: 10,
                cost_nanodollars: 0,
                latency: Duration::from_millis(1),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[tokio::test]
    async fn returns_exactly_count_ideas_without_failures() {
        let gateway = FlakyGateway {
            calls: AtomicU32::new(0),
            fail_on: vec![],
        };
        let outcome = generate(
            &gateway,
            None,
            "city parks",
            5,
            0.7,
            &ChatModel::openai("gpt-4o-mini"),
            &Attribution::new("test"),
        )
        .await;
        assert_eq!(outcome.ideas.len(), 5);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn isolates_per_item_failures() {
        let gateway = FlakyGateway {
            calls: AtomicU32::new(0),
            fail_on: vec![1, 3],
        };
        let outcome = generate(
            &gateway,
            None,
            "city parks",
            6,
            0.7,
            &ChatModel::openai("gpt-4o-mini"),
            &Attribution::new("test"),
        )
        .await;
        assert_eq!(outcome.ideas.len(), 4);
        assert_eq!(outcome.failures.len(), 2);
    }

    #[tokio::test]
    async fn every_idea_opens_with_title_marker() {
        let gateway = FlakyGateway {
            calls: AtomicU32::new(0),
            fail_on: vec![],
        };
        let outcome = generate(
            &gateway,
            None,
            "city parks",
            3,
            0.7,
            &ChatModel::openai("gpt-4o-mini"),
            &Attribution::new("test"),
        )
        .await;
        for idea in &outcome.ideas {
            assert!(idea.text().starts_with("Title:"));
        }
    }
}

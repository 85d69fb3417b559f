//! Provider gateway for the two model providers the pipeline consumes.
//!
//! `ProviderGateway` routes each request to the adapter matching its model's
//! provider and records usage through a `UsageSink`. There is no retry loop:
//! every provider error is terminal for its call site, and callers re-invoke
//! a stage if they want another attempt (cache hits make that cheap for the
//! calls that already succeeded).

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod pricing;
pub mod types;
pub mod usage;

use std::sync::Arc;

use anthropic::AnthropicAdapter;
use openai::{ChatProvider, OpenAiAdapter};
use usage::{CallStatus, ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use pricing::*;
pub use types::*;
pub use usage::{NoopUsageSink, StderrUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

pub struct ProviderGateway<U: UsageSinkTrait + ?Sized> {
    openai: Option<OpenAiAdapter>,
    anthropic: Option<AnthropicAdapter>,
    usage_sink: Arc<U>,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait + ?Sized> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSinkTrait + ?Sized> ProviderGateway<U> {
    /// Build both adapters from environment variables.
    ///
    /// A missing API key only becomes an error when a request is routed to
    /// that provider, so single-provider setups still work.
    pub fn from_env(usage_sink: Arc<U>) -> Self {
        Self {
            openai: OpenAiAdapter::from_env().ok(),
            anthropic: AnthropicAdapter::from_env().ok(),
            usage_sink,
        }
    }

    pub fn with_adapters(
        openai: Option<OpenAiAdapter>,
        anthropic: Option<AnthropicAdapter>,
        usage_sink: Arc<U>,
    ) -> Self {
        Self {
            openai,
            anthropic,
            usage_sink,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let result = match &req.model {
            ChatModel::OpenAi(_) => match &self.openai {
                Some(adapter) => adapter.chat(&req).await,
                None => Err(ProviderError::config(
                    "no OpenAI adapter configured (OPENAI_API_KEY not set?)",
                )),
            },
            ChatModel::Anthropic(_) => match &self.anthropic {
                Some(adapter) => adapter.chat(&req).await,
                None => Err(ProviderError::config(
                    "no Anthropic adapter configured (ANTHROPIC_API_KEY not set?)",
                )),
            },
        };

        match result {
            Ok(resp) => {
                self.record_usage(&req, &resp, CallStatus::Success, None)
                    .await;
                Ok(resp)
            }
            Err(err) => {
                let code = err.code().to_string();
                self.record_usage(&req, &ChatResponse::empty(), CallStatus::Error, Some(code))
                    .await;
                Err(err)
            }
        }
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        resp: &ChatResponse,
        status: CallStatus,
        error_code: Option<String>,
    ) {
        let endpoint = match req.model {
            ChatModel::OpenAi(_) => "chat/completions",
            ChatModel::Anthropic(_) => "messages",
        };

        let record = ProviderCallRecord::new(
            req.model.provider(),
            endpoint,
            req.model.model_id(),
            req.attribution.caller,
        )
        .tokens(resp.input_tokens as i32, resp.output_tokens as i32)
        .cost(resp.cost_nanodollars)
        .session(req.attribution.session_id)
        .latency(resp.latency.as_millis() as i32);

        let record = if status == CallStatus::Error {
            record.error(error_code.unwrap_or_else(|| "provider_error".to_string()))
        } else {
            record
        };

        self.usage_sink.record(record).await;
    }
}

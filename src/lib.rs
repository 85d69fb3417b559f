#![forbid(unsafe_code)]

//! # ideaforge
//!
//! A four-stage pipeline for brainstorming, evaluating, and refining story
//! ideas with two LLM providers, ending in exportable structured briefs.
//!
//! The stages: **generate** fans out one request per idea (a failed request
//! costs one idea, not the batch); **evaluate** restructures each idea into
//! five labeled sections, preserving input order; **brief** enhances each
//! selected idea and parses it with a strict five-section grammar, spending
//! exactly one repair call on malformed output before giving up on that
//! idea; **export** turns the parsed briefs into a document.
//!
//! Every provider call is memoized in a process-lifetime cache keyed on the
//! full parameter tuple, so re-running a stage only pays for the calls that
//! previously failed.

pub mod brief;
pub mod cache;
pub mod export;
pub mod gateway;
pub mod idea;
pub mod pipeline;
pub mod prompts;

pub use brief::{parse_brief, BriefParseError, IdeaBrief};
pub use cache::{get_or_compute, CallCache, CallCacheKey, MemoryCallCache};
pub use gateway::{Attribution, ChatGateway, ChatModel, ProviderGateway, UsageSink};
pub use idea::{select_by_titles, Idea, RefinedIdea};
pub use pipeline::{
    Pipeline, PipelineError, PipelineSession, SessionParams, ValidationError,
};

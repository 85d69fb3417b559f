//! In-memory memoized cache for provider calls.
//!
//! Every paid call is keyed by a deterministic serialization of everything
//! that affects its result: stage, model, prompts, and sampling parameters.
//! Keys embed the full prompt content, so distinct inputs never collide and
//! entries stay valid for the whole process lifetime — no TTL, no eviction.
//! Failed computations are never stored.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

/// Cache key for one provider call.
///
/// The per-request `ordinal` keeps the sibling requests of one generation
/// fan-out distinct; stages that dispatch unique prompts pass 0.
#[derive(Debug, Clone)]
pub struct CallCacheKey {
    pub stage: String,
    pub model: String,
    pub system_prompt_hash: String,
    pub user_prompt_hash: String,
    pub key_hash: String,
}

impl CallCacheKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stage: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
        sample_count: u32,
        ordinal: u32,
    ) -> Self {
        let system_prompt_hash = hash_text(system_prompt);
        let user_prompt_hash = hash_text(user_prompt);
        // Bit-exact temperature serialization keeps the key deterministic
        // across float formatting differences.
        let temperature_bits = format!("{:08x}", temperature.to_bits());
        let max_tokens_str = max_tokens.map(|m| m.to_string()).unwrap_or_default();
        let sample_count_str = sample_count.to_string();
        let ordinal_str = ordinal.to_string();
        let key_hash = hash_fields(&[
            stage,
            model,
            &system_prompt_hash,
            &user_prompt_hash,
            &temperature_bits,
            &max_tokens_str,
            &sample_count_str,
            &ordinal_str,
        ]);

        Self {
            stage: stage.to_string(),
            model: model.to_string(),
            system_prompt_hash,
            user_prompt_hash,
            key_hash,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Cache over raw completion texts, safe for concurrent use from a stage's
/// worker pool. Entries are immutable once written.
#[async_trait]
pub trait CallCache: Send + Sync {
    async fn get(&self, key: &CallCacheKey) -> Result<Option<Vec<String>>, CacheError>;
    async fn put(&self, key: &CallCacheKey, value: &[String]) -> Result<(), CacheError>;
}

/// Process-lifetime in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCallCache {
    entries: Mutex<HashMap<String, Vec<String>>>,
    hits: AtomicU64,
}

impl MemoryCallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached calls.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of reads served from the cache so far.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CallCache for MemoryCallCache {
    async fn get(&self, key: &CallCacheKey) -> Result<Option<Vec<String>>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let hit = entries.get(&key.key_hash).cloned();
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(hit)
    }

    async fn put(&self, key: &CallCacheKey, value: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.key_hash.clone(), value.to_vec());
        Ok(())
    }
}

/// Memoize a call: return the cached value for `key` if present, otherwise
/// run `compute`, store the result on success, and return it.
///
/// A failed `compute` is propagated without being stored, so the next call
/// with the same key retries the underlying computation. Cache read/write
/// failures degrade to a live call rather than failing the stage.
pub async fn get_or_compute<F, Fut, E>(
    cache: Option<&dyn CallCache>,
    key: &CallCacheKey,
    compute: F,
) -> Result<Vec<String>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<String>, E>>,
{
    if let Some(cache) = cache {
        match cache.get(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, stage = %key.stage, "cache read failed; falling back to live call");
            }
        }
    }

    let value = compute().await?;

    if let Some(cache) = cache {
        if let Err(err) = cache.put(key, &value).await {
            warn!(error = %err, stage = %key.stage, "cache write failed; result not memoized");
        }
    }

    Ok(value)
}

fn hash_text(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

fn hash_fields(fields: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            hasher.update(b"|");
        }
        hasher.update(field.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ordinal: u32) -> CallCacheKey {
        CallCacheKey::new(
            "generate",
            "gpt-4o-mini",
            "You generate ideas.",
            "Generate one idea for the topic: local elections",
            0.7,
            Some(400),
            1,
            ordinal,
        )
    }

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = MemoryCallCache::new();
        let k = key(0);
        assert!(cache.get(&k).await.unwrap().is_none());
        cache.put(&k, &["Title: A".to_string()]).await.unwrap();
        assert_eq!(
            cache.get(&k).await.unwrap(),
            Some(vec!["Title: A".to_string()])
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hit_count(), 1);
    }

    #[tokio::test]
    async fn ordinals_do_not_collide() {
        let cache = MemoryCallCache::new();
        cache.put(&key(0), &["first".to_string()]).await.unwrap();
        assert!(cache.get(&key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_or_compute_skips_compute_on_hit() {
        let cache = MemoryCallCache::new();
        let k = key(0);

        let v1: Result<_, CacheError> =
            get_or_compute(Some(&cache), &k, || async { Ok(vec!["one".to_string()]) }).await;
        assert_eq!(v1.unwrap(), vec!["one".to_string()]);

        // Second compute would return a different value; the cached one wins.
        let v2: Result<_, CacheError> =
            get_or_compute(Some(&cache), &k, || async { Ok(vec!["two".to_string()]) }).await;
        assert_eq!(v2.unwrap(), vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn get_or_compute_does_not_store_failures() {
        let cache = MemoryCallCache::new();
        let k = key(0);

        let failed: Result<Vec<String>, String> =
            get_or_compute(Some(&cache), &k, || async { Err("boom".to_string()) }).await;
        assert!(failed.is_err());
        assert!(cache.is_empty());

        // The next call re-invokes the computation.
        let ok: Result<Vec<String>, String> =
            get_or_compute(Some(&cache), &k, || async { Ok(vec!["ok".to_string()]) }).await;
        assert_eq!(ok.unwrap(), vec!["ok".to_string()]);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn get_or_compute_without_cache_always_computes() {
        let v: Result<Vec<String>, CacheError> =
            get_or_compute(None, &key(0), || async { Ok(vec!["live".to_string()]) }).await;
        assert_eq!(v.unwrap(), vec!["live".to_string()]);
    }
}

//! Cache idempotence: a hit never re-invokes the computation, and a failed
//! computation is never stored.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ideaforge::cache::{get_or_compute, CallCache, CallCacheKey, MemoryCallCache};

fn key() -> CallCacheKey {
    CallCacheKey::new(
        "evaluate",
        "claude-3-5-haiku-20241022",
        "system",
        "user",
        0.2,
        Some(4000),
        1,
        0,
    )
}

#[tokio::test]
async fn compute_invoked_at_most_once_for_identical_keys() {
    let cache = MemoryCallCache::new();
    let calls = AtomicU32::new(0);

    for _ in 0..3 {
        let value: Result<_, std::convert::Infallible> =
            get_or_compute(Some(&cache), &key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["refined".to_string()])
            })
            .await;
        assert_eq!(value.unwrap(), vec!["refined".to_string()]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.hit_count(), 2);
}

#[tokio::test]
async fn failed_compute_is_reinvoked_on_next_call() {
    let cache = MemoryCallCache::new();
    let calls = AtomicU32::new(0);

    let first: Result<Vec<String>, &str> = get_or_compute(Some(&cache), &key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err("provider down")
    })
    .await;
    assert!(first.is_err());
    assert!(cache.is_empty());

    let second: Result<Vec<String>, &str> = get_or_compute(Some(&cache), &key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["recovered".to_string()])
    })
    .await;
    assert_eq!(second.unwrap(), vec!["recovered".to_string()]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cache_is_safe_under_concurrent_writers() {
    let cache = Arc::new(MemoryCallCache::new());

    let mut handles = Vec::new();
    for i in 0..32u32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let key = CallCacheKey::new("generate", "gpt-4o-mini", "s", "u", 0.7, None, 1, i % 8);
            let value: Result<_, std::convert::Infallible> =
                get_or_compute(Some(cache.as_ref() as &dyn CallCache), &key, || async {
                    Ok(vec![format!("idea {}", i % 8)])
                })
                .await;
            value.unwrap()
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // 8 distinct ordinals → 8 entries, regardless of racing writers.
    assert_eq!(cache.len(), 8);
}

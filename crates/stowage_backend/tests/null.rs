// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the degraded backend.

use std::time::Duration;

use stowage_backend::{Backend, CacheBackend, Error, NullBackend};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

async fn assert_inert<B: CacheBackend>(backend: &B) {
    assert!(backend.get("key").await.expect("null get reports a miss").is_none());
    assert!(backend.set("key", vec![1], Some(Duration::from_secs(60))).await.is_err());
    assert!(backend.add("key", vec![1], None).await.is_err());
    assert!(backend.replace("key", vec![1], None).await.is_err());
    assert!(backend.delete("key").await.is_err());
    assert!(backend.increment("counter", 1).await.is_err());
    assert!(backend.decrement("counter", 1).await.is_err());
    assert!(backend.flush().await.is_err());
    assert!(backend.stats().await.is_err());
    assert!(backend.version().await.is_err());
    assert!(backend.server_status().await);
}

#[test]
fn null_backend_is_inert() {
    block_on(assert_inert(&NullBackend));
}

#[test]
fn null_backend_stays_inert_regardless_of_call_order() {
    block_on(async {
        let backend = NullBackend;

        // Interleave failing calls with probes; nothing changes.
        for _ in 0..3 {
            assert!(backend.flush().await.is_err());
            assert!(backend.server_status().await);
            assert!(backend.set("key", vec![2], None).await.is_err());
            assert!(backend.get("key").await.expect("null get reports a miss").is_none());
        }

        assert_inert(&backend).await;
    });
}

#[test]
fn degraded_backend_behaves_like_null_backend() {
    block_on(async {
        let backend = Backend::connect(|| async { Err::<NullBackend, _>(Error::from_message("connection refused")) }).await;

        assert!(backend.is_degraded());
        assert_inert(&backend).await;
    });
}

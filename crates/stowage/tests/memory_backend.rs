// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registry resolution against a live in-memory backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stowage::{CacheSavable, ConstructError, DescriptorTable, Environment, Loader, Origin, Registrable, Value};
use stowage_backend::{Backend, CacheBackend, Error};
use stowage_memory::MemoryBackend;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    text: String,
    #[serde(skip)]
    loader: Option<Loader>,
}

impl CacheSavable for Greeting {
    fn set_loader(&mut self, loader: Loader) {
        self.loader = Some(loader);
    }

    fn loader(&self) -> Option<&Loader> {
        self.loader.as_ref()
    }
}

impl Registrable for Greeting {
    fn construct(_factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
        let name = params.first().and_then(Value::as_str).unwrap_or("stranger");
        Ok(Self {
            text: format!("hello {name}"),
            loader: None,
        })
    }
}

async fn environment(memory: &MemoryBackend, ttl: Duration) -> Result<Environment, Box<dyn std::error::Error>> {
    let connecting = memory.clone();
    let backend = Backend::connect(move || async move { Ok::<_, Error>(connecting) }).await;
    assert!(!backend.is_degraded());

    Ok(Environment::builder()
        .descriptors(DescriptorTable::from_json(
            r#"{"app_greeting": {"params": 1, "construct": ["greeting"], "version": 1}}"#,
        )?)
        .register::<Greeting>("greeting")
        .backend(backend)
        .ttl(ttl)
        .build())
}

#[test]
fn later_executions_restore_from_memory() -> TestResult {
    block_on(async {
        let memory = MemoryBackend::new();
        let environment = environment(&memory, Duration::from_secs(60)).await?;

        let first = environment.execution().registry().resolve_with("app", "greeting", ["alice"]).await?;
        assert_eq!(first.origin(), Origin::Constructed);

        let second = environment.execution().registry().resolve_with("app", "greeting", ["alice"]).await?;
        assert_eq!(second.origin(), Origin::Cache);
        assert_eq!(second.downcast::<Greeting>().expect("a greeting").text, "hello alice");
        assert!(second.downcast::<Greeting>().expect("a greeting").loader().is_some());
        assert_eq!(memory.stats().await?.entries, Some(1));
        Ok(())
    })
}

#[test]
fn invalidation_rebuilds_under_a_new_key() -> TestResult {
    block_on(async {
        let memory = MemoryBackend::new();
        let environment = environment(&memory, Duration::from_secs(60)).await?;

        let before = environment.execution().registry().resolve_with("app", "greeting", ["bob"]).await?;
        assert_eq!(environment.execution().registry().invalidate("app", "greeting")?, 2);

        let after = environment.execution().registry().resolve_with("app", "greeting", ["bob"]).await?;
        assert_eq!(after.origin(), Origin::Constructed);
        assert_ne!(before.key(), after.key());
        assert_eq!(memory.stats().await?.entries, Some(2));
        Ok(())
    })
}

#[test]
fn expired_records_are_rebuilt() -> TestResult {
    block_on(async {
        let memory = MemoryBackend::new();
        let environment = environment(&memory, Duration::from_millis(20)).await?;

        let first = environment.execution().registry().resolve_with("app", "greeting", ["carol"]).await?;
        assert_eq!(first.origin(), Origin::Constructed);

        std::thread::sleep(Duration::from_millis(60));

        let second = environment.execution().registry().resolve_with("app", "greeting", ["carol"]).await?;
        assert_eq!(second.origin(), Origin::Constructed);
        Ok(())
    })
}

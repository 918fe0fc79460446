// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for registry resolution.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use stowage::{
    CacheKey, CacheSavable, ConstructError, DescriptorTable, Environment, Loader, Origin, Registrable, RegistryError, Resolution, Value,
};
use stowage_backend::testing::{BackendOp, MockBackend};
use stowage_backend::{Backend, CacheRecord};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[derive(Debug, Serialize, Deserialize)]
struct Dummy {
    name: String,
    factory: Option<String>,
    #[serde(skip)]
    loader: Option<Loader>,
}

impl CacheSavable for Dummy {
    fn set_loader(&mut self, loader: Loader) {
        self.loader = Some(loader);
    }

    fn loader(&self) -> Option<&Loader> {
        self.loader.as_ref()
    }
}

impl Registrable for Dummy {
    fn construct(factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
        match factory {
            None | Some("create_object") => Ok(Self {
                name: params.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
                factory: factory.map(str::to_owned),
                loader: None,
            }),
            Some(other) => Err(ConstructError::unknown_factory(other)),
        }
    }
}

const CONFIG: &str = r#"{
    "gld_dummyparams": {"params": 1, "construct": ["dummy", "create_object"], "version": 1},
    "gld_pair": {"params": 2, "construct": ["dummy"], "version": 1},
    "gld_config": {"params": 0, "construct": ["dummy"], "version": 1},
    "gld_broken": {"params": 0, "construct": ["dummy", "explode"], "version": 1},
    "gld_orphan": {"params": 0, "construct": ["nobody"], "version": 1}
}"#;

fn environment(backend: Backend) -> Environment {
    environment_with(CONFIG, backend)
}

fn environment_with(config: &str, backend: Backend) -> Environment {
    Environment::builder()
        .descriptors(DescriptorTable::from_json(config).expect("valid config"))
        .register::<Dummy>("dummy")
        .backend(backend)
        .build()
}

#[test]
fn zero_param_descriptor_resolves_immediately() -> TestResult {
    block_on(async {
        let environment = environment(Backend::degraded());
        let execution = environment.execution();

        let resolution = execution.registry().resolve("gld", "config").await?;
        let instance = resolution.ready().expect("no parameters needed");
        assert_eq!(instance.origin(), Origin::Constructed);
        assert_eq!(instance.downcast::<Dummy>().expect("a dummy").name, "");
        Ok(())
    })
}

#[test]
fn memoization_returns_the_same_instance() -> TestResult {
    block_on(async {
        let environment = environment(Backend::degraded());
        let execution = environment.execution();
        let registry = execution.registry();

        let first = registry.resolve_with("gld", "pair", ["a", "b"]).await?;
        let second = registry.resolve_with("gld", "pair", ["a", "b"]).await?;
        let other = registry.resolve_with("gld", "pair", ["b", "a"]).await?;

        assert!(first.ptr_eq(&second));
        assert_eq!(second.origin(), Origin::Memo);
        assert!(!first.ptr_eq(&other));
        assert_eq!(registry.memoized(), 2);
        Ok(())
    })
}

#[test]
fn incremental_and_full_resolution_share_the_memo() -> TestResult {
    block_on(async {
        let environment = environment(Backend::degraded());
        let execution = environment.execution();
        let registry = execution.registry();

        let Resolution::Pending(pending) = registry.resolve("gld", "pair").await? else {
            panic!("two parameters are required");
        };
        assert_eq!(pending.remaining(), 2);

        let Resolution::Pending(pending) = pending.supply("x").await? else {
            panic!("one parameter is still required");
        };
        assert_eq!(pending.remaining(), 1);
        assert_eq!(pending.params(), &[Value::from("x")]);

        let incremental = pending.supply(7).await?.ready().expect("all parameters supplied");
        let full = registry.resolve_with("gld", "pair", [Value::from("x"), Value::from(7)]).await?;

        assert!(incremental.ptr_eq(&full));
        assert_eq!(full.downcast::<Dummy>().expect("a dummy").name, r#""x",7"#);
        Ok(())
    })
}

static TALLY_BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Counts constructor calls; only `constructor_runs_once_per_argument_list` registers it.
#[derive(Debug, Serialize, Deserialize)]
struct Tally {
    params: usize,
    #[serde(skip)]
    loader: Option<Loader>,
}

impl CacheSavable for Tally {
    fn set_loader(&mut self, loader: Loader) {
        self.loader = Some(loader);
    }

    fn loader(&self) -> Option<&Loader> {
        self.loader.as_ref()
    }
}

impl Registrable for Tally {
    fn construct(_factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
        TALLY_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            params: params.len(),
            loader: None,
        })
    }
}

#[test]
fn constructor_runs_once_per_argument_list() -> TestResult {
    block_on(async {
        let environment = Environment::builder()
            .descriptors(DescriptorTable::from_json(
                r#"{"gld_tally": {"params": 2, "construct": ["tally"], "version": 1}}"#,
            )?)
            .register::<Tally>("tally")
            .build();
        let execution = environment.execution();
        let registry = execution.registry();

        let Resolution::Pending(pending) = registry.resolve("gld", "tally").await? else {
            panic!("two parameters are required");
        };
        let Resolution::Pending(pending) = pending.supply("a").await? else {
            panic!("one parameter is still required");
        };
        assert_eq!(TALLY_BUILDS.load(Ordering::SeqCst), 0);

        let instance = pending.supply("b").await?.ready().expect("all parameters supplied");
        assert_eq!(TALLY_BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(instance.downcast::<Tally>().expect("a tally").params, 2);

        let again = registry.resolve_with("gld", "tally", ["a", "b"]).await?;
        assert_eq!(again.origin(), Origin::Memo);
        assert!(again.ptr_eq(&instance));
        assert_eq!(TALLY_BUILDS.load(Ordering::SeqCst), 1);
        Ok(())
    })
}

#[test]
fn executions_do_not_share_memos() -> TestResult {
    block_on(async {
        let environment = environment(Backend::degraded());

        let first = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        let second = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        assert!(!first.ptr_eq(&second));
        assert_eq!(second.origin(), Origin::Constructed);
        Ok(())
    })
}

#[test]
fn wrong_arity_is_rejected() {
    block_on(async {
        let environment = environment(Backend::degraded());
        let execution = environment.execution();

        let error = execution
            .registry()
            .resolve_with("gld", "pair", ["only-one"])
            .await
            .expect_err("two parameters are required");
        assert!(matches!(
            error,
            RegistryError::ArityMismatch {
                expected: 2,
                supplied: 1,
                ..
            }
        ));

        let error = execution
            .registry()
            .resolve_with("gld", "config", ["extra"])
            .await
            .expect_err("no parameters are accepted");
        assert!(matches!(
            error,
            RegistryError::ArityMismatch {
                expected: 0,
                supplied: 1,
                ..
            }
        ));
        assert_eq!(execution.registry().memoized(), 0);
    });
}

#[test]
fn resolution_errors_are_reported() {
    block_on(async {
        let environment = environment(Backend::degraded());
        let execution = environment.execution();
        let registry = execution.registry();

        let missing = registry.resolve("gld", "nothing").await.expect_err("no descriptor");
        assert!(matches!(missing, RegistryError::DescriptorNotFound { .. }));

        let orphan = registry.resolve("gld", "orphan").await.expect_err("no constructor");
        assert!(matches!(orphan, RegistryError::ConstructorNotFound { type_name } if type_name == "nobody"));

        let broken = registry.resolve("gld", "broken").await.expect_err("unknown factory");
        assert!(matches!(broken, RegistryError::Construction { id, .. } if id == "gld_broken"));
    });
}

#[test]
fn constructed_objects_are_written_through_with_ttl() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));

        let instance = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        let writes = mock.operations();
        let Some(BackendOp::Set { key, ttl, .. }) = writes.iter().find(|op| matches!(op, BackendOp::Set { .. })) else {
            panic!("expected a write-through");
        };
        assert_eq!(key, instance.key().as_str());
        assert_eq!(*ttl, Some(stowage::DEFAULT_TTL));

        let record = CacheRecord::decode(&mock.raw(key).expect("stored"))?;
        assert!(record.is_current(1));
        Ok(())
    })
}

#[test]
fn later_executions_restore_from_cache() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));

        let constructed = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        let cached = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        assert_eq!(constructed.origin(), Origin::Constructed);
        assert_eq!(cached.origin(), Origin::Cache);
        assert_eq!(cached.key(), constructed.key());

        let dummy = cached.downcast::<Dummy>().expect("a dummy");
        assert_eq!(dummy.name, r#""v""#);
        assert_eq!(dummy.factory.as_deref(), Some("create_object"));
        assert!(dummy.loader.is_some());
        Ok(())
    })
}

#[test]
fn version_bump_in_configuration_ignores_old_records() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let v1 = environment_with(
            r#"{"gld_dummyparams": {"params": 1, "construct": ["dummy"], "version": 1}}"#,
            Backend::active(mock.clone()),
        );
        let v2 = environment_with(
            r#"{"gld_dummyparams": {"params": 1, "construct": ["dummy"], "version": 2}}"#,
            Backend::active(mock.clone()),
        );

        let old = v1.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        let new = v2.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        assert_eq!(new.origin(), Origin::Constructed);
        assert_ne!(old.key(), new.key());
        assert_eq!(mock.entry_count(), 2);
        Ok(())
    })
}

#[test]
fn stale_record_under_current_key_is_a_miss() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));
        let key = CacheKey::build("gld", "dummyparams", 1, &[Value::from("v")]);
        let stale = CacheRecord::new(br#"{"name":"stale","factory":null}"#.to_vec(), 9);
        mock.insert_raw(key.as_str(), stale.encode()?);

        let instance = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        assert_eq!(instance.origin(), Origin::Constructed);
        assert_eq!(instance.downcast::<Dummy>().expect("a dummy").name, r#""v""#);
        assert!(CacheRecord::decode(&mock.raw(key.as_str()).expect("rewritten"))?.is_current(1));
        Ok(())
    })
}

#[test]
fn undecodable_record_is_a_miss() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));
        let key = CacheKey::build("gld", "config", 1, &[]);
        mock.insert_raw(key.as_str(), b"garbage".to_vec());

        let instance = environment.execution().registry().resolve_with("gld", "config", Vec::<Value>::new()).await?;
        assert_eq!(instance.origin(), Origin::Constructed);

        let wrong_shape = CacheRecord::new(b"[1,2,3]".to_vec(), 1);
        mock.insert_raw(key.as_str(), wrong_shape.encode()?);
        let instance = environment.execution().registry().resolve_with("gld", "config", Vec::<Value>::new()).await?;
        assert_eq!(instance.origin(), Origin::Constructed);
        Ok(())
    })
}

#[test]
fn invalidate_retires_cached_records() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));

        let before = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        let execution = environment.execution();
        assert_eq!(execution.registry().invalidate("gld", "dummyparams")?, 2);

        let after = execution.registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        assert_eq!(after.origin(), Origin::Constructed);
        assert_ne!(before.key(), after.key());
        assert!(after.key().as_str().starts_with("gld_dummyparams:v2:"));

        let cached = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        assert_eq!(cached.origin(), Origin::Cache);
        assert_eq!(cached.key(), after.key());
        Ok(())
    })
}

#[test]
fn invalidate_unknown_descriptor_fails() {
    let environment = environment(Backend::degraded());
    let error = environment.execution().registry().invalidate("gld", "nothing").expect_err("no descriptor");
    assert!(matches!(error, RegistryError::DescriptorNotFound { .. }));
}

#[test]
fn backend_failures_never_fail_resolution() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        mock.fail_when(|_| true);
        let environment = environment(Backend::active(mock.clone()));

        let instance = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;

        assert_eq!(instance.origin(), Origin::Constructed);
        assert_eq!(mock.count(|op| matches!(op, BackendOp::Get(_))), 1);
        assert_eq!(mock.count(|op| matches!(op, BackendOp::Set { .. })), 1);
        assert_eq!(mock.entry_count(), 0);
        Ok(())
    })
}

#[test]
fn cache_self_persists_changes() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        let environment = environment(Backend::active(mock.clone()));
        let instance = environment.execution().registry().resolve_with("gld", "dummyparams", ["v"]).await?;
        mock.clear_operations();

        let dummy = instance.downcast::<Dummy>().expect("a dummy");
        assert!(dummy.cache_self().await);
        assert_eq!(mock.count(|op| matches!(op, BackendOp::Set { key, .. } if key == instance.key().as_str())), 1);
        Ok(())
    })
}

#[test]
fn degraded_backend_end_to_end() -> TestResult {
    block_on(async {
        let mock = MockBackend::new();
        mock.set_reachable(false);
        let connecting = mock.clone();
        let backend = Backend::connect(move || async move { Ok::<_, stowage_backend::Error>(connecting) }).await;
        assert!(backend.is_degraded());

        let environment = environment(backend);
        let execution = environment.execution();
        let registry = execution.registry();

        let Resolution::Pending(pending) = registry.resolve("gld", "dummyparams").await? else {
            panic!("one parameter is required");
        };
        let first = pending.supply("value").await?.ready().expect("all parameters supplied");
        let second = registry.resolve_with("gld", "dummyparams", ["value"]).await?;

        assert_eq!(first.origin(), Origin::Constructed);
        assert!(first.ptr_eq(&second));
        assert!(!first.downcast::<Dummy>().expect("a dummy").cache_self().await);

        let fresh = environment.execution().registry().resolve_with("gld", "dummyparams", ["value"]).await?;
        assert_eq!(fresh.origin(), Origin::Constructed);
        assert!(mock.operations().is_empty());
        Ok(())
    })
}

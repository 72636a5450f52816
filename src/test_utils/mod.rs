// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked API server, an in-memory store and backend, and object builders.

pub mod builders;
mod fake_runtime;
mod fake_store;
mod mock_service;

use crate::config::Config;
use crate::reconcilers::Context;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub use fake_runtime::FakeBackend;
pub use fake_store::FakeStore;
pub use mock_service::{not_found_json, MockService, RecordedRequest};

/// Ordered record of store writes and backend calls, shared between fakes
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Port the fake backend reports for clusters it creates
pub const TEST_APISERVER_PORT: u16 = 32766;

/// Store, backend and controller context wired to one shared journal
pub struct Harness {
    pub store: FakeStore,
    pub backend: FakeBackend,
    pub journal: Journal,
    pub ctx: Arc<Context<FakeStore>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config {
            kube_apiserver_port: TEST_APISERVER_PORT,
            requeue_interval: std::time::Duration::from_millis(10),
            default_work_dir: PathBuf::from("/tmp/capk-test"),
            ..Config::default()
        })
    }

    pub fn with_config(config: Config) -> Self {
        let journal = Journal::default();
        let store = FakeStore::with_journal(journal.clone());
        let backend = FakeBackend::with_journal(journal.clone());
        let ctx = Arc::new(Context::new(
            Arc::new(store.clone()),
            backend.registry(),
            config,
        ));
        Self {
            store,
            backend,
            journal,
            ctx,
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Position of the first journal entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.journal().iter().position(|e| e.starts_with(prefix))
    }
}

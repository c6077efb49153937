//! Test helpers: build AppState and router over an in-memory storage backend.
//!
//! Run from workspace root: `cargo test -p leadrelay-api`.

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use leadrelay_api::setup::routes;
use leadrelay_api::{AppState, Notifier};
use leadrelay_core::{Config, Enquiry};
use leadrelay_storage::InMemoryStorage;
use tokio::sync::Mutex;

/// Records every notification instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, enquiry: &Enquiry, text: &str) -> Result<(), String> {
        self.sent
            .lock()
            .await
            .push((enquiry.email.clone(), text.to_string()));
        Ok(())
    }
}

/// Test application: server plus handles on the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<InMemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait for detached rollback deletes to land.
    pub async fn wait_for_files(&self, expected: usize) {
        for _ in 0..100 {
            if self.storage.file_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} stored files, found {}",
            expected,
            self.storage.file_count()
        );
    }

    /// Wait for the fire-and-forget notification.
    pub async fn wait_for_notifications(&self, expected: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            let sent = self.notifier.sent.lock().await.clone();
            if sent.len() >= expected {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} notifications", expected);
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: Vec<(String, String)> = vec![
        ("STORAGE_BACKEND".to_string(), "memory".to_string()),
        ("ENVIRONMENT".to_string(), "development".to_string()),
    ];
    vars.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    Config::from_lookup(move |key| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("test config")
}

pub fn setup_test_app_with(config: Config, storage: InMemoryStorage) -> TestApp {
    let storage = Arc::new(storage);
    let notifier = Arc::new(RecordingNotifier::default());

    let state = Arc::new(AppState::new(
        config.clone(),
        storage.clone(),
        Some(notifier.clone() as Arc<dyn Notifier>),
    ));
    let router = routes::setup_routes(&config, state);
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        storage,
        notifier,
    }
}

pub fn setup_test_app(storage: InMemoryStorage) -> TestApp {
    setup_test_app_with(test_config(&[]), storage)
}

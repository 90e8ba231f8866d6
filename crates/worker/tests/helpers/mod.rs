//! In-memory fakes for exercising the session engine end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use handoff_browser::{AutomationSession, BrowserError, SessionFactory};
use handoff_bus::{Bus, LocalBus};
use handoff_core::crypto::PayloadCipher;
use handoff_core::types::RecordId;
use handoff_db::models::record::{
    actions, AutomationRecord, NewAction, RecordAction, RecordStatus,
};
use handoff_db::store::{RecordStore, StoreError};
use handoff_worker::detect::ChallengeDetector;
use handoff_worker::evidence::EvidenceStore;
use handoff_worker::rendezvous::RendezvousTable;
use handoff_worker::session::SessionEngine;
use tokio::sync::Mutex;

pub fn test_cipher() -> PayloadCipher {
    let key = STANDARD.encode([7u8; 32]);
    let nonce = STANDARD.encode([3u8; 12]);
    PayloadCipher::new(&key, &nonce).expect("valid key material")
}

/// A `Queued` record holding the encrypted payload, with the intake action
/// the API would have written.
pub fn queued_record(cipher: &PayloadCipher, payload_json: &str) -> AutomationRecord {
    let encrypted = cipher.encrypt(payload_json).expect("encrypt");
    let mut record = AutomationRecord::queued(encrypted, Some("test".into()));
    record.actions.push(RecordAction {
        id: 1,
        record_id: record.id,
        actor: "system".into(),
        action_type: actions::INTAKE.into(),
        notes: None,
        created_at: record.created_at,
    });
    record
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`RecordStore`] with the same transition semantics as the
/// Postgres implementation: field update plus action append, atomically.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RecordId, AutomationRecord>>,
    next_action_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_action_id: AtomicI64::new(2),
        }
    }

    pub async fn insert(&self, record: AutomationRecord) {
        self.records.lock().await.insert(record.id, record);
    }

    pub async fn get(&self, id: RecordId) -> Option<AutomationRecord> {
        self.records.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self, id: RecordId) -> Result<Option<AutomationRecord>, StoreError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn transition(
        &self,
        record: &AutomationRecord,
        action: NewAction,
    ) -> Result<RecordAction, StoreError> {
        let mut records = self.records.lock().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;

        stored.status = record.status;
        stored.result_url = record.result_url.clone();
        stored.screenshot_path = record.screenshot_path.clone();
        stored.html_snapshot_path = record.html_snapshot_path.clone();
        stored.updated_at = Utc::now();

        let stored_action = RecordAction {
            id: self.next_action_id.fetch_add(1, Ordering::SeqCst),
            record_id: record.id,
            actor: action.actor,
            action_type: action.action_type,
            notes: action.notes,
            created_at: stored.updated_at,
        };
        stored.actions.push(stored_action.clone());
        Ok(stored_action)
    }
}

/// Poll the store until the record reaches `status`, or panic.
pub async fn wait_for_status(store: &MemoryStore, id: RecordId, status: RecordStatus) {
    for _ in 0..200 {
        if let Some(record) = store.get(id).await {
            if record.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("record never reached {status:?}");
}

// ---------------------------------------------------------------------------
// FakeBrowser
// ---------------------------------------------------------------------------

/// Scripted browser page shared between the factory and the test, so
/// assertions can see what the engine did to it.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    inner: Arc<FakeBrowserInner>,
}

#[derive(Default)]
struct FakeBrowserInner {
    selectors: Vec<String>,
    markup: String,
    fail_navigate: bool,
    current_url: Mutex<String>,
    fills: Mutex<Vec<(String, String)>>,
    clicks: Mutex<Vec<String>>,
}

impl FakeBrowser {
    /// A page with no challenge markers.
    pub fn clean() -> Self {
        Self::default()
    }

    /// A page whose DOM matches the given challenge selector.
    pub fn with_challenge(selector: &str) -> Self {
        Self {
            inner: Arc::new(FakeBrowserInner {
                selectors: vec![selector.to_string()],
                markup: "<div class='challenge'></div>".into(),
                ..Default::default()
            }),
        }
    }

    /// A page whose navigation always fails.
    pub fn failing_navigation() -> Self {
        Self {
            inner: Arc::new(FakeBrowserInner {
                fail_navigate: true,
                ..Default::default()
            }),
        }
    }

    pub async fn fills(&self) -> Vec<(String, String)> {
        self.inner.fills.lock().await.clone()
    }

    pub async fn clicks(&self) -> Vec<String> {
        self.inner.clicks.lock().await.clone()
    }
}

#[async_trait]
impl AutomationSession for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if self.inner.fail_navigate {
            return Err(BrowserError::Protocol(
                "navigation refused by fixture".into(),
            ));
        }
        *self.inner.current_url.lock().await = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.inner.current_url.lock().await.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn markup(&self) -> Result<String, BrowserError> {
        Ok(self.inner.markup.clone())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        self.inner
            .fills
            .lock()
            .await
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.inner.clicks.lock().await.push(selector.to_string());
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.inner.selectors.iter().any(|s| s == selector))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, BrowserError> {
        Ok(Box::new(self.clone()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Fully wired engine over in-memory collaborators.
pub struct Harness {
    pub engine: Arc<SessionEngine>,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<LocalBus>,
    pub rendezvous: Arc<RendezvousTable>,
    pub cipher: PayloadCipher,
    _evidence_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(browser: FakeBrowser) -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(LocalBus::new());
        let rendezvous = Arc::new(RendezvousTable::new());
        let evidence_dir = tempfile::tempdir().expect("tempdir");
        let evidence = Arc::new(EvidenceStore::new(evidence_dir.path()).expect("evidence store"));

        let engine = Arc::new(SessionEngine::new(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::new(browser) as Arc<dyn SessionFactory>,
            Arc::clone(&bus) as Arc<dyn Bus>,
            Arc::new(test_cipher()),
            evidence,
            Arc::clone(&rendezvous),
            ChallengeDetector::default(),
        ));

        Self {
            engine,
            store,
            bus,
            rendezvous,
            cipher: test_cipher(),
            _evidence_dir: evidence_dir,
        }
    }

    /// Seed a queued record carrying `payload_json` and return its id.
    pub async fn seed(&self, payload_json: &str) -> RecordId {
        let record = queued_record(&self.cipher, payload_json);
        let id = record.id;
        self.store.insert(record).await;
        id
    }
}

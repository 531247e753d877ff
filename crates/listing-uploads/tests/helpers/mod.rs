//! Test helpers: a scripted direct-upload backend and an orchestrator wired to it.
//!
//! Run from workspace root: `cargo test -p listing-uploads`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use listing_api_client::ProgressObserver;
use listing_core::{DirectUploadBlob, DirectUploadTarget, SelectedFile, UploadError};
use listing_uploads::{
    AttachmentForm, DirectUploadBackend, MemoryPane, OrchestratorOptions, UploadOrchestrator,
};
use tokio::sync::Semaphore;

pub const ATTACHMENT_FIELD: &str = "listing[images][]";

/// What the backend does for one file name.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Reject authorization with this status
    pub authorize_status: Option<u16>,
    /// Byte counts reported to the progress observer, in order
    pub progress: Vec<u64>,
    /// Wait for [`ScriptedBackend::release`] after reporting progress
    pub hold: bool,
    /// Fail the storage request with this status after the hold
    pub store_status: Option<u16>,
}

impl Plan {
    pub fn succeed() -> Self {
        Self::default()
    }

    pub fn reject_authorization(status: u16) -> Self {
        Self {
            authorize_status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: &[u64]) -> Self {
        self.progress = progress.to_vec();
        self
    }

    pub fn held(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn fail_storage(mut self, status: u16) -> Self {
        self.store_status = Some(status);
        self
    }
}

/// Backend whose behaviour per file name is scripted by the test.
#[derive(Default)]
pub struct ScriptedBackend {
    plans: Mutex<HashMap<String, Plan>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    authorized: Mutex<Vec<String>>,
    stored: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn plan(&self, file_name: &str, plan: Plan) {
        self.plans
            .lock()
            .unwrap()
            .insert(file_name.to_string(), plan);
    }

    /// Let a held transfer for `file_name` continue.
    pub fn release(&self, file_name: &str) {
        self.gate(file_name).add_permits(1);
    }

    pub fn authorized(&self) -> Vec<String> {
        self.authorized.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    fn plan_for(&self, file_name: &str) -> Plan {
        self.plans
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .unwrap_or_default()
    }

    fn gate(&self, file_name: &str) -> Arc<Semaphore> {
        Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(file_name.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(0))),
        )
    }
}

#[async_trait]
impl DirectUploadBackend for ScriptedBackend {
    async fn authorize(
        &self,
        _endpoint: &str,
        file: &SelectedFile,
    ) -> Result<DirectUploadBlob, UploadError> {
        self.authorized.lock().unwrap().push(file.name.clone());
        let plan = self.plan_for(&file.name);
        if let Some(status) = plan.authorize_status {
            return Err(UploadError::authorization(
                &file.name,
                Some(status),
                "rejected",
            ));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(DirectUploadBlob {
            id: None,
            key: None,
            filename: file.name.clone(),
            content_type: Some(file.content_type.clone()),
            byte_size: Some(file.size),
            checksum: None,
            signed_id: format!("signed-{}-{}", file.name, n),
            direct_upload: DirectUploadTarget {
                url: format!("http://storage.test/{}", file.name),
                headers: Default::default(),
            },
        })
    }

    async fn store(
        &self,
        _blob: &DirectUploadBlob,
        file: &SelectedFile,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), UploadError> {
        let plan = self.plan_for(&file.name);
        for sent in &plan.progress {
            observer.bytes_sent(*sent, file.size);
            tokio::task::yield_now().await;
        }

        if plan.hold {
            let gate = self.gate(&file.name);
            let permit = gate
                .acquire()
                .await
                .map_err(|e| UploadError::Network(e.to_string()))?;
            permit.forget();
        }

        if let Some(status) = plan.store_status {
            return Err(UploadError::storage(&file.name, Some(status), "denied"));
        }

        observer.bytes_sent(file.size, file.size);
        self.stored.lock().unwrap().push(file.name.clone());
        Ok(())
    }
}

pub fn png(name: &str, size: usize) -> SelectedFile {
    SelectedFile::from_bytes(name, "image/png", vec![0x89u8; size])
}

pub fn orchestrator(backend: Arc<ScriptedBackend>) -> UploadOrchestrator<MemoryPane> {
    UploadOrchestrator::new(
        backend,
        MemoryPane::new(),
        Some(AttachmentForm::new(ATTACHMENT_FIELD)),
        OrchestratorOptions::default(),
    )
}

/// Apply transfer events until `done` holds.
pub async fn pump_until<F>(orchestrator: &mut UploadOrchestrator<MemoryPane>, mut done: F)
where
    F: FnMut(&UploadOrchestrator<MemoryPane>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(orchestrator) {
            if orchestrator.apply_next_event().await.is_none() {
                break;
            }
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Let spawned transfers run for a moment.
pub async fn let_transfers_run() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

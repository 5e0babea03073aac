//! In-memory collaborators shared by the pipeline integration tests.
//!
//! Each fake records its mutating calls so tests can assert that dry runs and
//! skipped records never touch the sink or the store.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assetsync_core::{Attachment, PipelineConfig, SourceRecord, TargetRecord};
use assetsync_pipeline::{
    BlobSink, CancellationToken, CollaboratorError, Pipeline, SourceCatalog, TargetStore,
};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub const SINK_BASE: &str = "https://cdn.test/assets";

pub struct FakeCatalog {
    pub records: Vec<SourceRecord>,
    pub fail: bool,
}

#[async_trait]
impl SourceCatalog for FakeCatalog {
    async fn list_records(&self) -> Result<Vec<SourceRecord>, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Backend("catalog unavailable".to_string()));
        }
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub records: Mutex<Vec<TargetRecord>>,
    pub updates: AtomicUsize,
    pub fail_list: bool,
    /// Reject updates for this target id.
    pub reject_update_for: Option<String>,
}

impl FakeStore {
    pub fn with(records: Vec<TargetRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn asset_urls(&self, id: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.asset_urls.clone())
            .unwrap_or_default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetStore for FakeStore {
    async fn list_records(&self) -> Result<Vec<TargetRecord>, CollaboratorError> {
        if self.fail_list {
            return Err(CollaboratorError::Backend("database unavailable".to_string()));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_asset_list(&self, id: &str, urls: &[String]) -> Result<(), CollaboratorError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.reject_update_for.as_deref() == Some(id) {
            return Err(CollaboratorError::Backend("constraint violation".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CollaboratorError::NotFound(id.to_string()))?;
        record.asset_urls = urls.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub uploads: Mutex<Vec<(String, Bytes, String)>>,
    /// Reject uploads whose key contains this fragment.
    pub reject_key_containing: Option<String>,
    /// Cancelled after the first successful upload.
    pub cancel_on_upload: Option<CancellationToken>,
    /// Number of leading calls answered with a transient 503.
    pub transient_failures: AtomicUsize,
    /// Every call, including rejected ones, as `(key, bytes)`.
    pub attempts: Mutex<Vec<(String, Bytes)>>,
}

impl FakeSink {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl BlobSink for FakeSink {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, CollaboratorError> {
        self.attempts
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.clone()));
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CollaboratorError::Rejected {
                service: "fake-sink",
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        if let Some(fragment) = &self.reject_key_containing {
            if key.contains(fragment.as_str()) {
                return Err(CollaboratorError::Rejected {
                    service: "fake-sink",
                    status: 413,
                    message: "payload too large".to_string(),
                });
            }
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), bytes, content_type.to_string()));
        if let Some(token) = &self.cancel_on_upload {
            token.cancel();
        }
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{SINK_BASE}/{key}")
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        max_edge_length: 64,
        fallback_max_edge_length: 32,
        per_record_delay_ms: 0,
        fetch_timeout_secs: 5,
        fetch_max_retries: 0,
        retry_backoff_base_ms: 0,
        ..PipelineConfig::default()
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn target(id: &str, name: &str, external_id: Option<&str>) -> TargetRecord {
    TargetRecord {
        id: id.to_string(),
        name: name.to_string(),
        alternate_names: vec![],
        external_id: external_id.map(str::to_string),
        asset_urls: vec![format!("https://old.test/{id}.png")],
    }
}

pub fn source(id: &str, name: &str, urls: &[String]) -> SourceRecord {
    SourceRecord {
        external_id: id.to_string(),
        name: name.to_string(),
        attachments: urls
            .iter()
            .enumerate()
            .map(|(i, url)| Attachment {
                url: url.clone(),
                filename: format!("{id}-{}.png", i + 1),
                declared_mime_type: Some("image/png".to_string()),
                declared_size: None,
            })
            .collect(),
    }
}

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub sink: Arc<FakeSink>,
    pub pipeline: Pipeline,
}

pub fn harness(
    config: PipelineConfig,
    sources: Vec<SourceRecord>,
    store: FakeStore,
    sink: FakeSink,
) -> Harness {
    let store = Arc::new(store);
    let sink = Arc::new(sink);
    let catalog = Arc::new(FakeCatalog {
        records: sources,
        fail: false,
    });
    let pipeline = Pipeline::new(config, catalog, store.clone(), sink.clone())
        .expect("pipeline builds");
    Harness {
        store,
        sink,
        pipeline,
    }
}

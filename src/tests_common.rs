// Shared test utilities: mock collaborators and temp-dir fixtures.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageBuffer, ImageFormat, Rgba};
use tempfile::TempDir;

use crate::error::{SerializableImageError, StoreError, ThumbnailError};
use crate::persistence::{
    ATTACHMENT_KIND, Attachment, AttachmentId, Document, DocumentId, Metadata, SizeDefinition,
    ThumbnailRecord,
};
use crate::services::document_service::{DocumentQuery, DocumentStore, MemoryDocumentStore};
use crate::services::persistence_service::AttachmentStore;
use crate::services::thumbnail_service::{GenerationResults, ImageEditor};
use crate::thumbnail::resize_dimensions;

pub fn init_test_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// Editor that pretends the source is `width`x`height` and writes
/// placeholder files instead of real images.
pub struct MockImageEditor {
    dims: (u32, u32),
    failing: HashSet<String>,
    dimension_calls: Mutex<usize>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl fmt::Debug for MockImageEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockImageEditor")
            .field("dims", &self.dims)
            .field("failing", &self.failing)
            .field("batches", &self.batches.lock().unwrap())
            .finish()
    }
}

impl MockImageEditor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dims: (width, height),
            failing: HashSet::new(),
            dimension_calls: Mutex::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Makes generation of `size_name` fail.
    pub fn failing_on(mut self, size_name: &str) -> Self {
        self.failing.insert(size_name.to_string());
        self
    }

    /// Total number of calls into the editor.
    pub fn call_count(&self) -> usize {
        *self.dimension_calls.lock().unwrap() + self.batches.lock().unwrap().len()
    }

    pub fn requested_batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl ImageEditor for MockImageEditor {
    fn source_dimensions(&self, _source: &Path) -> Result<(u32, u32), ThumbnailError> {
        *self.dimension_calls.lock().unwrap() += 1;
        Ok(self.dims)
    }

    fn generate_missing(&self, source: &Path, sizes: &[SizeDefinition]) -> GenerationResults {
        self.batches
            .lock()
            .unwrap()
            .push(sizes.iter().map(|s| s.name.clone()).collect());

        let mut results = BTreeMap::new();
        for size in sizes {
            let Some(dims) = resize_dimensions(self.dims.0, self.dims.1, size) else {
                results.insert(size.name.clone(), Err(ThumbnailError::Dimensions(size.name.clone())));
                continue;
            };
            let path = self.resulting_filename(source, &dims.suffix(), None);
            if self.failing.contains(&size.name) {
                results.insert(
                    size.name.clone(),
                    Err(ThumbnailError::ImageSave(
                        path,
                        SerializableImageError {
                            message: "Mock thumbnail save error".to_string(),
                        },
                    )),
                );
                continue;
            }
            fs::write(&path, "mock thumbnail").expect("mock editor failed to write placeholder");
            results.insert(
                size.name.clone(),
                Ok(ThumbnailRecord {
                    file: path.file_name().unwrap().to_string_lossy().into_owned(),
                    width: dims.dst_w,
                    height: dims.dst_h,
                    mime_type: None,
                }),
            );
        }
        results
    }
}

/// Attachment store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    pub uploads_dir: PathBuf,
    pub attachments: Mutex<BTreeMap<AttachmentId, (Attachment, Option<Metadata>)>>,
    pub reject_writes: bool,
    pub writes: Mutex<usize>,
}

impl MemoryAttachmentStore {
    pub fn new(uploads_dir: &Path) -> Self {
        Self {
            uploads_dir: uploads_dir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn add(&self, id: u64, kind: &str, file: &str, metadata: Option<Metadata>) {
        let attachment = Attachment {
            id: AttachmentId(id),
            kind: kind.to_string(),
            file: file.to_string(),
            mime_type: None,
        };
        self.attachments
            .lock()
            .unwrap()
            .insert(AttachmentId(id), (attachment, metadata));
    }

    pub fn add_image(&self, id: u64, file: &str) {
        self.add(id, ATTACHMENT_KIND, file, None);
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl AttachmentStore for MemoryAttachmentStore {
    fn get_by_id(&self, id: AttachmentId) -> Option<Attachment> {
        self.attachments.lock().unwrap().get(&id).map(|(a, _)| a.clone())
    }

    fn get_file_path(&self, id: AttachmentId) -> Option<PathBuf> {
        self.get_by_id(id).map(|a| self.uploads_dir.join(a.file))
    }

    fn get_metadata(&self, id: AttachmentId) -> Option<Metadata> {
        self.attachments
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|(_, m)| m.clone())
    }

    fn set_metadata(&self, id: AttachmentId, metadata: &Metadata) -> Result<(), StoreError> {
        if self.reject_writes {
            return Err(StoreError::Rejected("mock store is read-only".to_string()));
        }
        let mut guard = self.attachments.lock().unwrap();
        let entry = guard.get_mut(&id).ok_or(StoreError::NotFound(id.0))?;
        entry.1 = Some(metadata.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Document store that rejects updates for chosen ids and records every
/// query and update it sees.
#[derive(Debug, Default)]
pub struct FlakyDocumentStore {
    pub inner: MemoryDocumentStore,
    pub rejected: HashSet<DocumentId>,
    pub fail_queries: bool,
    pub queries: Mutex<Vec<DocumentQuery>>,
    pub updates: Mutex<Vec<DocumentId>>,
}

impl FlakyDocumentStore {
    pub fn with_documents(docs: Vec<(u64, &str, &str)>) -> Self {
        let store = Self::default();
        for (id, kind, content) in docs {
            store
                .inner
                .insert(Document {
                    id: DocumentId(id),
                    kind: kind.to_string(),
                    content: content.to_string(),
                })
                .expect("Failed to seed FlakyDocumentStore");
        }
        store
    }

    pub fn reject(mut self, id: u64) -> Self {
        self.rejected.insert(DocumentId(id));
        self
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn content(&self, id: u64) -> String {
        self.inner.get(DocumentId(id)).map(|d| d.content).unwrap_or_default()
    }
}

impl DocumentStore for FlakyDocumentStore {
    fn query(&self, query: &DocumentQuery) -> Result<Vec<Document>, StoreError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_queries {
            return Err(StoreError::Rejected("mock query failure".to_string()));
        }
        self.inner.query(query)
    }

    fn update(&self, id: DocumentId, content: &str) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push(id);
        if self.rejected.contains(&id) {
            return Err(StoreError::Rejected(format!("document {} is locked", id)));
        }
        self.inner.update(id, content)
    }

    fn public_kinds(&self) -> Vec<String> {
        self.inner.public_kinds()
    }
}

#[derive(Debug)]
pub struct ThumbnailTestEnvironment {
    pub temp_dir: TempDir,
    pub source_dir: PathBuf,
}

impl ThumbnailTestEnvironment {
    pub fn source_path(&self, filename: &str) -> PathBuf {
        self.source_dir.join(filename)
    }
}

pub fn setup_thumbnail_test_env() -> ThumbnailTestEnvironment {
    let temp_dir = TempDir::new().expect("Failed to create temp_dir for thumbnail test");
    let source_dir = temp_dir.path().join("2024").join("05");
    fs::create_dir_all(&source_dir).expect("Failed to create source_dir for thumbnail test env");
    ThumbnailTestEnvironment {
        temp_dir,
        source_dir,
    }
}

/// Writes a checkerboard PNG of the given size.
pub fn create_dummy_image_file(dir: &Path, filename: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(filename);
    let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    img.save_with_format(&path, ImageFormat::Png)
        .expect("Failed to save dummy image in tests_common::create_dummy_image_file");
    path
}

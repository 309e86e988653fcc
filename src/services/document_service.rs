// src/services/document_service.rs

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::persistence::{ATTACHMENT_KIND, Document, DocumentId};

/// One page request against a [`DocumentStore`]. Results are always ordered
/// by id, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    /// Kinds to include. Empty matches every kind.
    pub kinds: Vec<String>,
    /// Ids to include. Empty matches every id.
    pub ids: Vec<DocumentId>,
    /// Substring the content must contain.
    pub contains: String,
    pub offset: usize,
    pub limit: usize,
}

impl DocumentQuery {
    pub fn matches(&self, doc: &Document) -> bool {
        (self.kinds.is_empty() || self.kinds.iter().any(|k| *k == doc.kind))
            && (self.ids.is_empty() || self.ids.contains(&doc.id))
            && doc.content.contains(&self.contains)
    }
}

/// Documents whose text may embed attachment thumbnails.
pub trait DocumentStore {
    fn query(&self, query: &DocumentQuery) -> Result<Vec<Document>, StoreError>;

    fn update(&self, id: DocumentId, content: &str) -> Result<(), StoreError>;

    /// Kinds that are publicly visible. Used when the caller names none.
    fn public_kinds(&self) -> Vec<String>;
}

/// In-memory [`DocumentStore`].
#[derive(Debug)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentId, Document>>,
    public_kinds: Vec<String>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new(vec!["post".to_string(), "page".to_string()])
    }
}

impl MemoryDocumentStore {
    pub fn new(public_kinds: Vec<String>) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            public_kinds,
        }
    }

    /// Adds or replaces a document.
    pub fn insert(&self, document: Document) -> Result<(), StoreError> {
        let mut docs = self.documents.write().map_err(|_| poisoned())?;
        docs.insert(document.id, document);
        Ok(())
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.read().ok()?.get(&id).cloned()
    }
}

fn poisoned() -> StoreError {
    StoreError::Rejected("document store lock poisoned".to_string())
}

impl DocumentStore for MemoryDocumentStore {
    fn query(&self, query: &DocumentQuery) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents.read().map_err(|_| poisoned())?;
        Ok(docs
            .values()
            .filter(|doc| query.matches(doc))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn update(&self, id: DocumentId, content: &str) -> Result<(), StoreError> {
        let mut docs = self.documents.write().map_err(|_| poisoned())?;
        let doc = docs.get_mut(&id).ok_or(StoreError::NotFound(id.0))?;
        doc.content = content.to_string();
        Ok(())
    }

    fn public_kinds(&self) -> Vec<String> {
        self.public_kinds
            .iter()
            .filter(|k| k.as_str() != ATTACHMENT_KIND)
            .cloned()
            .collect()
    }
}

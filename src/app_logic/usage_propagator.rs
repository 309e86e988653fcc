// src/app_logic/usage_propagator.rs

use std::collections::BTreeMap;

use crate::app_logic::embed_rewriter::{EmbedPatterns, ResolvedThumbnail};
use crate::error::UsageError;
use crate::persistence::{ATTACHMENT_KIND, AttachmentId, DocumentId};
use crate::services::document_service::{DocumentQuery, DocumentStore};

/// Which documents to visit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    /// Empty means every public kind the store reports.
    pub kinds: Vec<String>,
    /// Empty means no restriction.
    pub ids: Vec<DocumentId>,
}

pub type UsageOutcomes = BTreeMap<DocumentId, Result<DocumentId, UsageError>>;

#[derive(Debug, Default)]
pub struct UsageReport {
    /// One entry per document whose content changed and was submitted.
    pub outcomes: UsageOutcomes,
    /// Embeds left untouched because their size did not resolve.
    pub unresolved: BTreeMap<DocumentId, Vec<String>>,
    pub pages: usize,
}

impl UsageReport {
    pub fn updated(&self) -> usize {
        self.outcomes.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|r| r.is_err()).count()
    }
}

pub struct UsagePropagator<'a> {
    store: &'a dyn DocumentStore,
    page_size: usize,
}

impl<'a> UsagePropagator<'a> {
    pub fn new(store: &'a dyn DocumentStore, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Rewrites the embeds of `attachment_id` in every matching document.
    ///
    /// Pages are fetched by ascending id until one comes back empty. If the
    /// store changes between pages a document may be seen twice or missed.
    pub fn propagate_usage<F>(
        &self,
        attachment_id: AttachmentId,
        filter: &DocumentFilter,
        mut resolve: F,
    ) -> Result<UsageReport, UsageError>
    where
        F: FnMut(&str) -> Option<ResolvedThumbnail>,
    {
        let patterns = EmbedPatterns::new(attachment_id)?;
        let kinds: Vec<String> = if filter.kinds.is_empty() {
            self.store.public_kinds()
        } else {
            filter.kinds.clone()
        }
        .into_iter()
        .filter(|k| k != ATTACHMENT_KIND)
        .collect();

        let mut report = UsageReport::default();
        // An empty kind list would match every kind, attachments included.
        if kinds.is_empty() {
            log::warn!(
                "UsagePropagator: No non-attachment document kinds to search for attachment {}",
                attachment_id
            );
            return Ok(report);
        }
        let mut offset = 0;
        loop {
            let query = DocumentQuery {
                kinds: kinds.clone(),
                ids: filter.ids.clone(),
                contains: patterns.search_token(),
                offset,
                limit: self.page_size,
            };
            let page = self
                .store
                .query(&query)
                .map_err(|source| UsageError::Query { offset, source })?;
            if page.is_empty() {
                break;
            }
            report.pages += 1;

            for doc in page {
                let rewrite = patterns.rewrite(&doc.content, &mut resolve);
                if !rewrite.unresolved.is_empty() {
                    report.unresolved.insert(doc.id, rewrite.unresolved);
                }
                if !rewrite.changed {
                    continue;
                }
                let outcome = match self.store.update(doc.id, &rewrite.text) {
                    Ok(()) => {
                        log::info!(
                            "UsagePropagator: Updated {} embed(s) of attachment {} in document {}",
                            rewrite.replaced,
                            attachment_id,
                            doc.id
                        );
                        Ok(doc.id)
                    }
                    Err(source) => {
                        log::error!(
                            "UsagePropagator: Failed to update document {}: {}",
                            doc.id,
                            source
                        );
                        Err(UsageError::Update { id: doc.id, source })
                    }
                };
                report.outcomes.insert(doc.id, outcome);
            }
            offset += self.page_size;
        }

        log::debug!(
            "UsagePropagator: Attachment {} done after {} page(s): {} updated, {} failed",
            attachment_id,
            report.pages,
            report.updated(),
            report.failed()
        );
        Ok(report)
    }
}

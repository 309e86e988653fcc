// src/app_logic/regenerator.rs

use crate::app_logic::reconciler::{Reconciler, Reconciliation, SourceImage};
use crate::app_logic::thumbnail_resolver::MetadataResolver;
use crate::app_logic::usage_propagator::{DocumentFilter, UsagePropagator, UsageReport};
use crate::config::{RegenConfig, RegenerateArgs};
use crate::error::RegenerateError;
use crate::persistence::{Attachment, AttachmentId};
use crate::services::document_service::DocumentStore;
use crate::services::persistence_service::AttachmentStore;
use crate::services::size_registry::SizeRegistry;
use crate::services::thumbnail_service::ImageEditor;

#[derive(Debug)]
pub struct RegenerationReport {
    pub attachment_id: AttachmentId,
    pub reconciliation: Reconciliation,
    /// `None` when usage updates were not requested.
    pub usages: Option<UsageReport>,
}

/// Regenerates one attachment end to end: thumbnails, stored metadata and
/// the documents that embed it.
pub struct Regenerator<'a> {
    attachments: &'a dyn AttachmentStore,
    registry: &'a dyn SizeRegistry,
    editor: &'a dyn ImageEditor,
    documents: &'a dyn DocumentStore,
    config: &'a RegenConfig,
}

impl<'a> Regenerator<'a> {
    pub fn new(
        attachments: &'a dyn AttachmentStore,
        registry: &'a dyn SizeRegistry,
        editor: &'a dyn ImageEditor,
        documents: &'a dyn DocumentStore,
        config: &'a RegenConfig,
    ) -> Self {
        Self {
            attachments,
            registry,
            editor,
            documents,
            config,
        }
    }

    /// Looks up an attachment and checks that it may be regenerated.
    pub fn attachment(&self, id: AttachmentId) -> Result<Attachment, RegenerateError> {
        let attachment = self
            .attachments
            .get_by_id(id)
            .ok_or(RegenerateError::AttachmentNotFound(id))?;
        if !attachment.is_attachment() {
            return Err(RegenerateError::NotAnAttachment {
                id,
                kind: attachment.kind,
            });
        }
        if self.config.is_excluded(id) {
            return Err(RegenerateError::ExcludedByPolicy(id));
        }
        Ok(attachment)
    }

    fn source_image(&self, attachment: &Attachment) -> Result<SourceImage, RegenerateError> {
        let missing = || RegenerateError::SourceFileMissing {
            relative_path: attachment.file.clone(),
        };
        let path = self.attachments.get_file_path(attachment.id).ok_or_else(missing)?;
        if !path.is_file() {
            return Err(missing());
        }
        Ok(SourceImage {
            path,
            relative_path: attachment.file.clone(),
        })
    }

    /// Regenerates with the per-call options from the configuration.
    pub fn regenerate_with_defaults(
        &self,
        id: AttachmentId,
    ) -> Result<RegenerationReport, RegenerateError> {
        self.regenerate(id, &self.config.defaults)
    }

    pub fn regenerate(
        &self,
        id: AttachmentId,
        args: &RegenerateArgs,
    ) -> Result<RegenerationReport, RegenerateError> {
        let attachment = self.attachment(id)?;
        let source = self.source_image(&attachment)?;
        let prior = self.attachments.get_metadata(id);

        log::info!(
            "Regenerator: Regenerating attachment {} ({}), only missing: {}, prune: {}",
            id,
            source.relative_path,
            args.policy.only_missing,
            args.policy.prune_unregistered
        );

        let reconciliation =
            Reconciler::new(self.editor, self.registry).reconcile(&source, prior.as_ref(), args.policy)?;

        self.attachments
            .set_metadata(id, &reconciliation.metadata)
            .map_err(RegenerateError::MetadataUpdate)?;

        let usages = if args.update_usages {
            let resolver = MetadataResolver::new(&reconciliation.metadata, &self.config.uploads_url);
            let filter = DocumentFilter {
                kinds: args.document_kinds.clone(),
                ids: args.document_ids.clone(),
            };
            let propagator =
                UsagePropagator::new(self.documents, self.config.effective_page_size(args));
            Some(propagator.propagate_usage(id, &filter, |size| resolver.resolve(size))?)
        } else {
            None
        };

        Ok(RegenerationReport {
            attachment_id: id,
            reconciliation,
            usages,
        })
    }
}

use std::sync::Arc;

use crate::services::{
    extractor::FieldExtractor, line::ReplyNotifier, reconciler::ReconcilePolicy,
    sheets::SheetStore, signature::SignatureVerifier,
};

/// Shared application state passed to all route handlers.
///
/// Everything here is built once in `main` and read-only afterwards. The sheet
/// client lives as long as the server and is dropped on shutdown.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub extractor: Arc<FieldExtractor>,
    pub store: Arc<dyn SheetStore>,
    pub notifier: Arc<dyn ReplyNotifier>,
    pub policy: ReconcilePolicy,
}

impl AppState {
    pub fn new(
        verifier: SignatureVerifier,
        extractor: FieldExtractor,
        store: Arc<dyn SheetStore>,
        notifier: Arc<dyn ReplyNotifier>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            extractor: Arc::new(extractor),
            store,
            notifier,
            policy,
        }
    }
}

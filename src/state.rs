use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::OrmConn,
    evidence::{EvidenceStore, LocalEvidenceStore},
    middleware::auth::{CatalogReviewerAuthorizer, ReviewerAuthorizer},
    shipping::ShippingRates,
    store::{CartStore, OrderStore, PostgresCartStore, PostgresStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub carts: Arc<dyn CartStore>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub authorizer: Arc<dyn ReviewerAuthorizer>,
    pub shipping: Arc<dyn ShippingRates>,
    pub max_evidence_bytes: usize,
}

impl AppState {
    /// Assembles the state; reviewer authorization defaults to catalog ownership.
    pub fn new(
        store: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        evidence: Arc<dyn EvidenceStore>,
        shipping: Arc<dyn ShippingRates>,
        max_evidence_bytes: usize,
    ) -> Self {
        let authorizer = Arc::new(CatalogReviewerAuthorizer::new(store.clone()));
        Self {
            store,
            carts,
            evidence,
            authorizer,
            shipping,
            max_evidence_bytes,
        }
    }

    pub fn postgres(orm: OrmConn, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(PostgresStore::new(orm.clone())),
            Arc::new(PostgresCartStore::new(orm)),
            Arc::new(LocalEvidenceStore::new(config.evidence_dir.clone())),
            Arc::new(config.shipping_rates()),
            config.max_evidence_bytes,
        )
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn ReviewerAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }
}

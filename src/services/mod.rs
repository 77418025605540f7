//! Application services: the checkout pipeline, payment reconciliation, order
//! management and design records, all hanging off [`Shop`].

use std::sync::Arc;

use crate::auth::Identity;
use crate::config::Settings;
use crate::domain::aggregates::Role;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Currency, WristbandType};
use crate::events::EventBus;
use crate::notifications::{Mailer, Notifier};
use crate::payments::PaymentGateway;
use crate::pricing::{self, PriceQuote, PricingConfig, QuoteRequest};
use crate::storage::ObjectStore;
use crate::store::Store;
use crate::{Result, ShopError};

pub mod checkout;
pub mod designs;
pub mod orders;
pub mod reconcile;

pub use checkout::{CheckoutRequest, CheckoutResponse};
pub use designs::SaveDesignRequest;
pub use orders::{AdminStats, StatusUpdate};
pub use reconcile::{ReconcileOutcome, ReconciledOrder};

#[derive(Clone)]
pub struct Shop {
    store: Arc<dyn Store>,
    payments: Arc<dyn PaymentGateway>,
    objects: Arc<dyn ObjectStore>,
    notifier: Notifier,
    events: EventBus,
    settings: Arc<Settings>,
}

impl Shop {
    pub fn new(
        store: Arc<dyn Store>,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        objects: Arc<dyn ObjectStore>,
        events: EventBus,
        settings: Settings,
    ) -> Self {
        let notifier = Notifier::new(store.clone(), mailer, settings.email.clone());
        Self { store, payments, objects, notifier, events, settings: Arc::new(settings) }
    }

    pub fn store(&self) -> &dyn Store { self.store.as_ref() }

    /// Stored tariff for the type/currency, or the built-in standard one.
    pub async fn tariff(&self, wristband_type: WristbandType, currency: Currency) -> Result<PricingConfig> {
        Ok(self.store.pricing_config(wristband_type, currency).await?
            .unwrap_or_else(|| PricingConfig::standard(wristband_type, currency)))
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<PriceQuote> {
        let tariff = self.tariff(request.wristband_type, request.currency).await?;
        Ok(pricing::quote(&tariff, request)?)
    }

    async fn publish(&self, events: Vec<DomainEvent>) {
        if !events.is_empty() {
            self.events.publish(events).await;
        }
    }
}

pub(crate) fn require_admin(identity: &Identity) -> Result<()> {
    if identity.has_role(Role::Admin) { Ok(()) } else { Err(ShopError::Forbidden("Unauthorized. Admin access required.".into())) }
}

//! In-process store used when no database is configured, and by tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{OrderFilter, Store, StoreError, StoreResult};
use crate::domain::aggregates::{Design, Order, OrderStatus, PaymentStatus, Profile, Role, Supplier};
use crate::domain::value_objects::{Currency, WristbandType};
use crate::pricing::PricingConfig;

#[derive(Default)]
struct State {
    profiles: HashMap<Uuid, Profile>,
    roles: HashMap<Uuid, HashSet<Role>>,
    tokens: HashMap<String, Uuid>,
    designs: HashMap<Uuid, Design>,
    suppliers: HashMap<Uuid, Supplier>,
    orders: HashMap<Uuid, Order>,
    pricing: HashMap<(WristbandType, Currency), PricingConfig>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

fn stored(order: &Order) -> Order {
    let mut copy = order.clone();
    copy.events.clear();
    copy
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.state.lock().await.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let state = self.state.lock().await;
        Ok(state.profiles.values().find(|p| p.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.profiles.contains_key(&user_id) { return Err(StoreError::InvalidReference); }
        state.roles.entry(user_id).or_default().insert(role);
        Ok(())
    }

    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state.roles.get(&user_id).map(|r| r.iter().copied().collect()).unwrap_or_default();
        roles.sort_by_key(|r| r.as_str());
        Ok(roles)
    }

    async fn insert_token(&self, token_hash: &str, user_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.profiles.contains_key(&user_id) { return Err(StoreError::InvalidReference); }
        if state.tokens.contains_key(token_hash) { return Err(StoreError::AlreadyExists); }
        state.tokens.insert(token_hash.to_string(), user_id);
        Ok(())
    }

    async fn user_for_token(&self, token_hash: &str) -> StoreResult<Option<Uuid>> {
        Ok(self.state.lock().await.tokens.get(token_hash).copied())
    }

    async fn insert_design(&self, design: &Design) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.designs.contains_key(&design.id) { return Err(StoreError::AlreadyExists); }
        let mut copy = design.clone();
        copy.events.clear();
        state.designs.insert(design.id, copy);
        Ok(())
    }

    async fn get_design(&self, id: Uuid) -> StoreResult<Option<Design>> {
        Ok(self.state.lock().await.designs.get(&id).cloned())
    }

    async fn list_designs(&self, owner: Uuid) -> StoreResult<Vec<Design>> {
        let state = self.state.lock().await;
        let mut designs: Vec<Design> = state.designs.values().filter(|d| d.owner == owner).cloned().collect();
        designs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(designs)
    }

    async fn delete_design(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.designs.remove(&id).is_none() { return Ok(false); }
        for order in state.orders.values_mut().filter(|o| o.design_id == Some(id)) {
            order.design_id = None;
        }
        Ok(true)
    }

    async fn insert_supplier(&self, supplier: &Supplier) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.suppliers.contains_key(&supplier.id) { return Err(StoreError::AlreadyExists); }
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn get_supplier(&self, id: Uuid) -> StoreResult<Option<Supplier>> {
        Ok(self.state.lock().await.suppliers.get(&id).cloned())
    }

    async fn supplier_for_owner(&self, owner: Uuid) -> StoreResult<Option<Supplier>> {
        let state = self.state.lock().await;
        Ok(state.suppliers.values().filter(|s| s.owner == owner).min_by_key(|s| s.created_at).cloned())
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        let state = self.state.lock().await;
        let mut suppliers: Vec<Supplier> = state.suppliers.values().cloned().collect();
        suppliers.sort_by(|a, b| a.company_name.cmp(&b.company_name));
        Ok(suppliers)
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.orders.contains_key(&order.id) { return Err(StoreError::AlreadyExists); }
        if order.design_id.is_some_and(|d| !state.designs.contains_key(&d))
            || order.supplier_id.is_some_and(|s| !state.suppliers.contains_key(&s))
        {
            return Err(StoreError::InvalidReference);
        }
        state.orders.insert(order.id, stored(order));
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn get_orders(&self, ids: &[Uuid]) -> StoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = ids.iter().filter_map(|id| state.orders.get(id)).cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orders.dedup_by_key(|o| o.id);
        Ok(orders)
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(newest_first(state.orders.values().filter(|o| filter.matches(o)).cloned().collect()))
    }

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let Some(current) = state.orders.get(&order.id) else { return Ok(()) };
        let mut next = stored(order);
        next.payment_status = current.payment_status;
        next.payment_intent_id = current.payment_intent_id.clone();
        if current.payment_status == PaymentStatus::Paid && next.status == OrderStatus::Pending {
            next.status = current.status;
        }
        state.orders.insert(order.id, next);
        Ok(())
    }

    async fn set_checkout_session(&self, ids: &[Uuid], session_id: &str) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for order in state.orders.values_mut().filter(|o| ids.contains(&o.id)) {
            order.checkout_session_id = Some(session_id.to_string());
            order.updated_at = chrono::Utc::now();
            updated += 1;
        }
        Ok(updated)
    }

    async fn orders_for_session(&self, session_id: &str) -> StoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state.orders.values()
            .filter(|o| o.checkout_session_id.as_deref() == Some(session_id))
            .cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn compare_and_set_payment(&self, order: &Order, expected: PaymentStatus) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(current) = state.orders.get_mut(&order.id) else { return Ok(false) };
        if current.payment_status != expected { return Ok(false); }
        current.payment_status = order.payment_status;
        current.status = order.status;
        current.payment_intent_id = order.payment_intent_id.clone();
        if current.checkout_session_id.is_none() {
            current.checkout_session_id = order.checkout_session_id.clone();
        }
        current.updated_at = order.updated_at;
        Ok(true)
    }

    async fn pricing_config(&self, wristband_type: WristbandType, currency: Currency) -> StoreResult<Option<PricingConfig>> {
        Ok(self.state.lock().await.pricing.get(&(wristband_type, currency)).cloned())
    }

    async fn upsert_pricing_config(&self, config: &PricingConfig) -> StoreResult<()> {
        self.state.lock().await.pricing.insert((config.wristband_type, config.currency), config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{DesignDraft, OrderOptions};
    use crate::pricing::{quote, QuoteRequest};

    fn order(owner: Uuid, design_id: Option<Uuid>) -> Order {
        let request = QuoteRequest { wristband_type: WristbandType::Tyvek, quantity: 1000, currency: Currency::Eur, print_type: Default::default(), has_trademark: false, has_qr_code: false };
        let q = quote(&PricingConfig::standard(WristbandType::Tyvek, Currency::Eur), &request).unwrap();
        Order::place(owner, design_id, None, &q, OrderOptions::default())
    }

    #[tokio::test]
    async fn test_delete_design_clears_order_reference() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let design = Design::create(owner, "https://cdn/a.png", DesignDraft::default());
        let other = Design::create(owner, "https://cdn/b.png", DesignDraft::default());
        store.insert_design(&design).await.unwrap();
        store.insert_design(&other).await.unwrap();
        let linked = order(owner, Some(design.id));
        let unrelated = order(owner, Some(other.id));
        store.insert_order(&linked).await.unwrap();
        store.insert_order(&unrelated).await.unwrap();

        assert!(store.delete_design(design.id).await.unwrap());
        assert!(!store.delete_design(design.id).await.unwrap());
        assert_eq!(store.get_order(linked.id).await.unwrap().unwrap().design_id, None);
        assert_eq!(store.get_order(unrelated.id).await.unwrap().unwrap().design_id, Some(other.id));
    }

    #[tokio::test]
    async fn test_compare_and_set_payment_only_once() {
        let store = MemoryStore::new();
        let mut o = order(Uuid::now_v7(), None);
        store.insert_order(&o).await.unwrap();
        o.apply_payment(PaymentStatus::Paid, Some("pi_1".into()));
        assert!(store.compare_and_set_payment(&o, PaymentStatus::Pending).await.unwrap());
        assert!(!store.compare_and_set_payment(&o, PaymentStatus::Pending).await.unwrap());
        let saved = store.get_order(o.id).await.unwrap().unwrap();
        assert_eq!(saved.payment_status, PaymentStatus::Paid);
        assert_eq!(saved.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_stale_save_keeps_payment_state() {
        let store = MemoryStore::new();
        let stale = order(Uuid::now_v7(), None);
        store.insert_order(&stale).await.unwrap();
        let mut paid = stale.clone();
        paid.apply_payment(PaymentStatus::Paid, Some("pi_1".into()));
        assert!(store.compare_and_set_payment(&paid, PaymentStatus::Pending).await.unwrap());

        let mut stale = stale;
        stale.annotate("rush");
        store.save_order(&stale).await.unwrap();
        let saved = store.get_order(stale.id).await.unwrap().unwrap();
        assert_eq!(saved.payment_status, PaymentStatus::Paid);
        assert_eq!(saved.status, OrderStatus::Approved);
        assert_eq!(saved.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(saved.admin_notes.as_deref(), Some("rush"));
    }

    #[tokio::test]
    async fn test_rejects_unknown_references() {
        let store = MemoryStore::new();
        let err = store.insert_order(&order(Uuid::now_v7(), Some(Uuid::now_v7()))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference));
        assert!(matches!(store.grant_role(Uuid::now_v7(), Role::Admin).await, Err(StoreError::InvalidReference)));
    }
}

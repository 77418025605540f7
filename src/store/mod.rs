//! Persistence for profiles, designs, suppliers, orders and pricing.
//!
//! [`PgStore`] is the production backend; [`MemoryStore`] backs local runs
//! without `DATABASE_URL` and the service tests.

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Design, Order, PaymentStatus, Profile, Role, Supplier};
use crate::domain::value_objects::{Currency, WristbandType};
use crate::pricing::PricingConfig;

pub mod memory;
pub mod postgres;
mod records;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    AlreadyExists,

    #[error("related record not found")]
    InvalidReference,

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error")]
    Sql(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            _ => Self::Sql(error),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Which orders a dashboard lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    Owner(Uuid),
    Supplier(Uuid),
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Owner(owner) => order.owner == *owner,
            Self::Supplier(supplier) => order.supplier_id == Some(*supplier),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts or refreshes a profile by id.
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()>;
    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()>;
    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>>;
    async fn insert_token(&self, token_hash: &str, user_id: Uuid) -> StoreResult<()>;
    async fn user_for_token(&self, token_hash: &str) -> StoreResult<Option<Uuid>>;

    async fn insert_design(&self, design: &Design) -> StoreResult<()>;
    async fn get_design(&self, id: Uuid) -> StoreResult<Option<Design>>;
    async fn list_designs(&self, owner: Uuid) -> StoreResult<Vec<Design>>;
    /// Deletes the design and clears the reference on orders pointing at it.
    async fn delete_design(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_supplier(&self, supplier: &Supplier) -> StoreResult<()>;
    async fn get_supplier(&self, id: Uuid) -> StoreResult<Option<Supplier>>;
    async fn supplier_for_owner(&self, owner: Uuid) -> StoreResult<Option<Supplier>>;
    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>>;

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn get_orders(&self, ids: &[Uuid]) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>>;
    /// Last-write-wins update of the mutable order columns. Payment columns only
    /// change through [`Store::compare_and_set_payment`], and a paid order's status
    /// is never reset to pending.
    async fn save_order(&self, order: &Order) -> StoreResult<()>;
    async fn set_checkout_session(&self, ids: &[Uuid], session_id: &str) -> StoreResult<u64>;
    async fn orders_for_session(&self, session_id: &str) -> StoreResult<Vec<Order>>;
    /// Writes payment/status fields only if the stored payment status still equals `expected`.
    async fn compare_and_set_payment(&self, order: &Order, expected: PaymentStatus) -> StoreResult<bool>;

    async fn pricing_config(&self, wristband_type: WristbandType, currency: Currency) -> StoreResult<Option<PricingConfig>>;
    async fn upsert_pricing_config(&self, config: &PricingConfig) -> StoreResult<()>;
}

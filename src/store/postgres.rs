//! Postgres-backed store.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::records::{DesignRecord, OrderRecord, PricingRecord, ProfileRecord, SupplierRecord};
use super::{OrderFilter, Store, StoreError, StoreResult};
use crate::domain::aggregates::{Design, Order, PaymentStatus, Profile, Role, Supplier};
use crate::domain::value_objects::{Currency, WristbandType};
use crate::pricing::PricingConfig;

const ORDER_COLUMNS: &str = "id, user_id, design_id, supplier_id, quantity, unit_price, base_price, total_price, currency, \
    print_type, has_trademark, trademark_text, has_secure_guests, extra_charges, status, payment_status, shipping_address, \
    stripe_session_id, stripe_payment_intent_id, admin_notes, created_at, updated_at";

const DESIGN_COLUMNS: &str = "id, user_id, design_url, wristband_color, wristband_type, custom_text, text_color, text_position, created_at";

const SUPPLIER_COLUMNS: &str = "id, user_id, company_name, contact_email, contact_phone, address, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

fn orders(records: Vec<OrderRecord>) -> StoreResult<Vec<Order>> {
    records.into_iter().map(Order::try_from).collect()
}

fn quantity(order: &Order) -> StoreResult<i32> {
    i32::try_from(order.quantity.value()).map_err(|_| StoreError::Corrupt(format!("quantity out of range: {}", order.quantity.value())))
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        sqlx::query("INSERT INTO profiles (id, email, full_name) VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, full_name = EXCLUDED.full_name")
            .bind(profile.id).bind(&profile.email).bind(&profile.full_name)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>("SELECT id, email, full_name FROM profiles WHERE id = $1")
            .bind(id).fetch_optional(&self.db).await?;
        Ok(record.map(Profile::from))
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>("SELECT id, email, full_name FROM profiles WHERE lower(email) = lower($1)")
            .bind(email).fetch_optional(&self.db).await?;
        Ok(record.map(Profile::from))
    }

    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id, role) DO NOTHING")
            .bind(user_id).bind(role.as_str())
            .execute(&self.db).await?;
        Ok(())
    }

    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
            .bind(user_id).fetch_all(&self.db).await?;
        rows.into_iter()
            .map(|(role,)| role.parse::<Role>().map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect()
    }

    async fn insert_token(&self, token_hash: &str, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO api_tokens (token_hash, user_id) VALUES ($1, $2)")
            .bind(token_hash).bind(user_id)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn user_for_token(&self, token_hash: &str) -> StoreResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM api_tokens WHERE token_hash = $1")
            .bind(token_hash).fetch_optional(&self.db).await?;
        Ok(row.map(|(id,)| id))
    }

    async fn insert_design(&self, design: &Design) -> StoreResult<()> {
        sqlx::query("INSERT INTO designs (id, user_id, design_url, wristband_color, wristband_type, custom_text, text_color, text_position, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)")
            .bind(design.id).bind(design.owner).bind(&design.image_url).bind(&design.color)
            .bind(design.wristband_type.as_str()).bind(&design.custom_text).bind(&design.text_color)
            .bind(design.text_position.as_ref().map(Json)).bind(design.created_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get_design(&self, id: Uuid) -> StoreResult<Option<Design>> {
        sqlx::query_as::<_, DesignRecord>(&format!("SELECT {DESIGN_COLUMNS} FROM designs WHERE id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Design::try_from).transpose()
    }

    async fn list_designs(&self, owner: Uuid) -> StoreResult<Vec<Design>> {
        sqlx::query_as::<_, DesignRecord>(&format!("SELECT {DESIGN_COLUMNS} FROM designs WHERE user_id = $1 ORDER BY created_at DESC"))
            .bind(owner).fetch_all(&self.db).await?
            .into_iter().map(Design::try_from).collect()
    }

    async fn delete_design(&self, id: Uuid) -> StoreResult<bool> {
        // orders.design_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM designs WHERE id = $1").bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_supplier(&self, supplier: &Supplier) -> StoreResult<()> {
        sqlx::query("INSERT INTO suppliers (id, user_id, company_name, contact_email, contact_phone, address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)")
            .bind(supplier.id).bind(supplier.owner).bind(&supplier.company_name).bind(&supplier.contact_email)
            .bind(&supplier.contact_phone).bind(&supplier.address).bind(supplier.created_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get_supplier(&self, id: Uuid) -> StoreResult<Option<Supplier>> {
        let record = sqlx::query_as::<_, SupplierRecord>(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"))
            .bind(id).fetch_optional(&self.db).await?;
        Ok(record.map(Supplier::from))
    }

    async fn supplier_for_owner(&self, owner: Uuid) -> StoreResult<Option<Supplier>> {
        let record = sqlx::query_as::<_, SupplierRecord>(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE user_id = $1 ORDER BY created_at LIMIT 1"))
            .bind(owner).fetch_optional(&self.db).await?;
        Ok(record.map(Supplier::from))
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        let records = sqlx::query_as::<_, SupplierRecord>(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY company_name"))
            .fetch_all(&self.db).await?;
        Ok(records.into_iter().map(Supplier::from).collect())
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"))
            .bind(order.id).bind(order.owner).bind(order.design_id).bind(order.supplier_id)
            .bind(quantity(order)?).bind(order.unit_price).bind(order.base_price).bind(order.total_price)
            .bind(order.currency.code()).bind(order.options.print_type.as_str()).bind(order.options.has_trademark)
            .bind(&order.options.trademark_text).bind(order.options.has_qr_code).bind(Json(&order.extra_charges))
            .bind(order.status.as_str()).bind(order.payment_status.as_str()).bind(order.shipping_address.as_ref().map(Json))
            .bind(&order.checkout_session_id).bind(&order.payment_intent_id).bind(&order.admin_notes)
            .bind(order.created_at).bind(order.updated_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Order::try_from).transpose()
    }

    async fn get_orders(&self, ids: &[Uuid]) -> StoreResult<Vec<Order>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ANY($1) ORDER BY created_at"))
            .bind(ids).fetch_all(&self.db).await?;
        orders(records)
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let query = match filter {
            OrderFilter::All => sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC")).fetch_all(&self.db).await?,
            OrderFilter::Owner(owner) => sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"))
                .bind(owner).fetch_all(&self.db).await?,
            OrderFilter::Supplier(supplier) => sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE supplier_id = $1 ORDER BY created_at DESC"))
                .bind(supplier).fetch_all(&self.db).await?,
        };
        orders(query)
    }

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query("UPDATE orders SET design_id = $2, supplier_id = $3, unit_price = $4, total_price = $5, extra_charges = $6, \
                     status = CASE WHEN payment_status = 'paid' AND $7 = 'pending' THEN status ELSE $7 END, \
                     shipping_address = $8, stripe_session_id = $9, admin_notes = $10, updated_at = $11 WHERE id = $1")
            .bind(order.id).bind(order.design_id).bind(order.supplier_id).bind(order.unit_price).bind(order.total_price)
            .bind(Json(&order.extra_charges)).bind(order.status.as_str())
            .bind(order.shipping_address.as_ref().map(Json)).bind(&order.checkout_session_id)
            .bind(&order.admin_notes).bind(order.updated_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn set_checkout_session(&self, ids: &[Uuid], session_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE orders SET stripe_session_id = $2, updated_at = NOW() WHERE id = ANY($1)")
            .bind(ids).bind(session_id)
            .execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    async fn orders_for_session(&self, session_id: &str) -> StoreResult<Vec<Order>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_session_id = $1 ORDER BY created_at"))
            .bind(session_id).fetch_all(&self.db).await?;
        orders(records)
    }

    async fn compare_and_set_payment(&self, order: &Order, expected: PaymentStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET payment_status = $2, status = $3, stripe_payment_intent_id = $4, stripe_session_id = COALESCE(stripe_session_id, $5), updated_at = $6 WHERE id = $1 AND payment_status = $7")
            .bind(order.id).bind(order.payment_status.as_str()).bind(order.status.as_str())
            .bind(&order.payment_intent_id).bind(&order.checkout_session_id).bind(order.updated_at)
            .bind(expected.as_str())
            .execute(&self.db).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn pricing_config(&self, wristband_type: WristbandType, currency: Currency) -> StoreResult<Option<PricingConfig>> {
        sqlx::query_as::<_, PricingRecord>("SELECT wristband_type, currency, min_quantity, base_price, black_print_extra, full_color_print_extra, trademark_per_thousand, qr_code_per_thousand FROM pricing_config WHERE wristband_type = $1 AND currency = $2")
            .bind(wristband_type.as_str()).bind(currency.code())
            .fetch_optional(&self.db).await?
            .map(PricingConfig::try_from).transpose()
    }

    async fn upsert_pricing_config(&self, config: &PricingConfig) -> StoreResult<()> {
        let min_quantity = i32::try_from(config.min_quantity).map_err(|_| StoreError::Corrupt(format!("min_quantity out of range: {}", config.min_quantity)))?;
        sqlx::query("INSERT INTO pricing_config (wristband_type, currency, min_quantity, base_price, black_print_extra, full_color_print_extra, trademark_per_thousand, qr_code_per_thousand) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
            ON CONFLICT (wristband_type, currency) DO UPDATE SET min_quantity = EXCLUDED.min_quantity, base_price = EXCLUDED.base_price, black_print_extra = EXCLUDED.black_print_extra, \
            full_color_print_extra = EXCLUDED.full_color_print_extra, trademark_per_thousand = EXCLUDED.trademark_per_thousand, qr_code_per_thousand = EXCLUDED.qr_code_per_thousand, updated_at = NOW()")
            .bind(config.wristband_type.as_str()).bind(config.currency.code()).bind(min_quantity)
            .bind(config.base_price).bind(config.black_print_extra).bind(config.full_color_print_extra)
            .bind(config.trademark_per_thousand).bind(config.qr_code_per_thousand)
            .execute(&self.db).await?;
        Ok(())
    }
}

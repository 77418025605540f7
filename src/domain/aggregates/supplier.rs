//! Supplier and customer profile records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::UnknownVariant;

/// Manufacturing partner assigned per order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Supplier {
    pub id: Uuid,
    pub owner: Uuid,
    pub company_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSignup {
    #[validate(length(min = 1, message = "company name is required"))]
    pub company_name: String,
    #[validate(email(message = "contact email is invalid"))]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Supplier {
    pub fn register(owner: Uuid, signup: SupplierSignup) -> Self {
        Self {
            id: Uuid::now_v7(), owner,
            company_name: signup.company_name.trim().to_string(),
            contact_email: signup.contact_email.trim().to_lowercase(),
            contact_phone: signup.contact_phone, address: signup.address,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> &str { self.full_name.as_deref().unwrap_or("Customer") }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Admin, User, Supplier }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Admin => "admin", Self::User => "user", Self::Supplier => "supplier" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "supplier" => Ok(Self::Supplier),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

//! Aggregates module
pub mod cart;
pub mod design;
pub mod order;
pub mod supplier;

pub use cart::{Cart, CartEntry, CartError, CartItem, CartLine, DesignSource};
pub use design::{Design, DesignDraft};
pub use order::{Order, OrderError, OrderOptions, OrderStatus, PaymentStatus};
pub use supplier::{Profile, Role, Supplier, SupplierSignup};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    EmergencyNumber, EmergencyNumberUpdate, NewEmergencyNumber, NewQuote, NewTip, NewUser, Quote,
    QuoteUpdate, Tip, TipUpdate, User, UserUpdate,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, AppError>;

/// Repository Trait
///
/// The abstract contract for every persistence operation. Handlers and services only see
/// this trait, so the backing engine (Postgres, or the in-memory store used for local
/// development and tests) is chosen once at startup.
///
/// Every failure of the backing store surfaces as `AppError::Connection`; uniqueness
/// violations on username/email surface as `AppError::DuplicateUser`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    /// All users, newest id first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// True if any user already owns this username or this email.
    async fn user_exists(&self, username: &str, email: &str) -> StoreResult<bool>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // --- Emergency numbers ---
    /// Ordered by (categoria, nombre).
    async fn list_emergency_numbers(&self, active_only: bool) -> StoreResult<Vec<EmergencyNumber>>;
    async fn get_emergency_number(&self, id: i64) -> StoreResult<Option<EmergencyNumber>>;
    async fn create_emergency_number(&self, number: NewEmergencyNumber) -> StoreResult<EmergencyNumber>;
    async fn update_emergency_number(
        &self,
        id: i64,
        update: EmergencyNumberUpdate,
    ) -> StoreResult<Option<EmergencyNumber>>;
    async fn delete_emergency_number(&self, id: i64) -> StoreResult<bool>;

    // --- Tips ---
    /// Newest first.
    async fn list_tips(&self, active_only: bool) -> StoreResult<Vec<Tip>>;
    async fn get_tip(&self, id: i64) -> StoreResult<Option<Tip>>;
    async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip>;
    async fn update_tip(&self, id: i64, update: TipUpdate) -> StoreResult<Option<Tip>>;
    async fn delete_tip(&self, id: i64) -> StoreResult<bool>;

    // --- Quote of the day ---
    /// All quotes, newest publication first.
    async fn list_quotes(&self) -> StoreResult<Vec<Quote>>;
    async fn get_quote(&self, id: i64) -> StoreResult<Option<Quote>>;
    /// The most recently published active quote, if any.
    async fn active_quote(&self) -> StoreResult<Option<Quote>>;
    /// Deactivates every quote and inserts `quote` as the only active one, atomically.
    async fn replace_active_quote(&self, quote: NewQuote) -> StoreResult<Quote>;
    /// Partial update. Activating a quote deactivates all others in the same unit of work.
    async fn update_quote(&self, id: i64, update: QuoteUpdate) -> StoreResult<Option<Quote>>;
    async fn delete_quote(&self, id: i64) -> StoreResult<bool>;
    /// Deactivates active quotes published before `cutoff`. Returns the rows affected.
    async fn expire_quotes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

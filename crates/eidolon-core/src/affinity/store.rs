//! Affinity record store trait.
//!
//! Defines the persistence interface for affinity records. Implementations
//! (e.g., the SQLite store) live in eidolon-infra.

use std::future::Future;
use std::pin::Pin;

use eidolon_types::affinity::AffinityRecord;
use eidolon_types::error::AffinityError;
use uuid::Uuid;

/// Trait for affinity record persistence.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in eidolon-infra.
pub trait AffinityStore: Send + Sync {
    /// Load the record for one (persona, interlocutor) pair, if any.
    fn get(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
    ) -> impl Future<Output = Result<Option<AffinityRecord>, AffinityError>> + Send;

    /// Insert or replace a record.
    fn put(
        &self,
        record: &AffinityRecord,
    ) -> impl Future<Output = Result<(), AffinityError>> + Send;

    /// All records for one persona, across interlocutors.
    fn list_for_persona(
        &self,
        persona_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<AffinityRecord>, AffinityError>> + Send;
}

/// Object-safe version of [`AffinityStore`] with boxed futures.
pub trait AffinityStoreDyn: Send + Sync {
    fn get_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        interlocutor_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AffinityRecord>, AffinityError>> + Send + 'a>>;

    fn put_boxed<'a>(
        &'a self,
        record: &'a AffinityRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AffinityError>> + Send + 'a>>;

    fn list_for_persona_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AffinityRecord>, AffinityError>> + Send + 'a>>;
}

/// Blanket implementation: any `AffinityStore` automatically implements
/// `AffinityStoreDyn`.
impl<T: AffinityStore> AffinityStoreDyn for T {
    fn get_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
        interlocutor_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AffinityRecord>, AffinityError>> + Send + 'a>>
    {
        Box::pin(self.get(persona_id, interlocutor_id))
    }

    fn put_boxed<'a>(
        &'a self,
        record: &'a AffinityRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AffinityError>> + Send + 'a>> {
        Box::pin(self.put(record))
    }

    fn list_for_persona_boxed<'a>(
        &'a self,
        persona_id: &'a Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AffinityRecord>, AffinityError>> + Send + 'a>>
    {
        Box::pin(self.list_for_persona(persona_id))
    }
}

/// Type-erased affinity store for runtime selection.
pub struct BoxAffinityStore {
    inner: Box<dyn AffinityStoreDyn + Send + Sync>,
}

impl BoxAffinityStore {
    /// Wrap a concrete `AffinityStore` in a type-erased box.
    pub fn new<T: AffinityStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    /// Load the record for one (persona, interlocutor) pair, if any.
    pub async fn get(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
    ) -> Result<Option<AffinityRecord>, AffinityError> {
        self.inner.get_boxed(persona_id, interlocutor_id).await
    }

    /// Insert or replace a record.
    pub async fn put(&self, record: &AffinityRecord) -> Result<(), AffinityError> {
        self.inner.put_boxed(record).await
    }

    /// All records for one persona, across interlocutors.
    pub async fn list_for_persona(
        &self,
        persona_id: &Uuid,
    ) -> Result<Vec<AffinityRecord>, AffinityError> {
        self.inner.list_for_persona_boxed(persona_id).await
    }
}

//! Conversation store.
//!
//! Owns the lifetime of [`ConversationRecord`]s in the `conversations`
//! collection. Turns are append-only; the store assigns each turn its `seq`.
//!
//! Listing is ordered by `(created_at, conversation_id)` descending and paged
//! with an opaque [`PageToken`], so records created after a token was issued
//! sort ahead of it and never shift later pages.

use crate::ports::clock::{Clock, SystemClock};
use crate::ports::storage_backend::{Direction, Document, Query, StorageBackend};
use crate::use_cases::store_error::StoreError;
use crs_domain::{
    ConversationFilter, ConversationId, ConversationRecord, ConversationStatistics, MAX_PAGE_SIZE,
    Page, PageToken, SessionKey, Turn, clamp_page_size, timestamp,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collection holding conversation documents.
pub const CONVERSATIONS: &str = "conversations";

pub struct ConversationStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl Clone for ConversationStore {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start a new conversation for `session_key` with one turn.
    pub async fn create_conversation(
        &self,
        session_key: &SessionKey,
        initial_turn: Turn,
    ) -> Result<ConversationId, StoreError> {
        let id = ConversationId::generate();
        let record =
            ConversationRecord::start(id.clone(), session_key.clone(), initial_turn, self.clock.now());
        self.save(&record).await?;
        debug!(conversation = %id, session = %session_key, "Created conversation");
        Ok(id)
    }

    /// Append a turn, returning the position it was stored at.
    pub async fn append_turn(&self, id: &ConversationId, turn: Turn) -> Result<u32, StoreError> {
        let mut record = self.load_existing(id).await?;
        record.push_turn(turn, self.clock.now());
        self.save(&record).await?;
        let seq = record.turns.len() as u32 - 1;
        debug!(conversation = %id, seq, "Appended turn");
        Ok(seq)
    }

    pub async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationRecord, StoreError> {
        self.load(id)
            .await?
            .ok_or_else(|| StoreError::conversation_not_found(id.as_str()))
    }

    /// Set or overwrite the user classification. Turns are untouched.
    pub async fn update_user_type(
        &self,
        id: &ConversationId,
        user_type: &str,
    ) -> Result<(), StoreError> {
        let mut record = self.load_existing(id).await?;
        record.set_user_type(user_type, self.clock.now());
        self.save(&record).await?;
        debug!(conversation = %id, user_type, "Updated user type");
        Ok(())
    }

    /// Remove a conversation. Removing an absent conversation succeeds.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), StoreError> {
        self.backend.delete(CONVERSATIONS, id.as_str()).await?;
        debug!(conversation = %id, "Deleted conversation");
        Ok(())
    }

    /// One page of conversations matching `filter`, newest first.
    ///
    /// `page_size` is clamped to `1..=1000`, zero selecting the default.
    /// `next_page_token` is `None` once the set is exhausted, so a caller never
    /// receives an empty trailing page.
    pub async fn list_conversations(
        &self,
        filter: &ConversationFilter,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<Page<ConversationRecord>, StoreError> {
        let page_size = clamp_page_size(page_size);
        let mut query = Self::filter_query(filter).limit(page_size + 1);
        if let Some(token) = page_token {
            let token = PageToken::decode(token)?;
            query = query.start_after(
                Value::String(timestamp::format(&token.created_at)),
                token.conversation_id.as_str(),
            );
        }

        let docs = self.backend.query(CONVERSATIONS, &query).await?;
        let mut items = docs
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;

        let next_page_token = if items.len() > page_size {
            items.truncate(page_size);
            items.last().map(|last| PageToken::after(last).encode())
        } else {
            None
        };
        debug!(
            returned = items.len(),
            filtered = !filter.is_empty(),
            has_more = next_page_token.is_some(),
            "Listed conversations"
        );
        Ok(Page {
            items,
            next_page_token,
        })
    }

    /// Every conversation matching `filter`, newest first, up to `limit`.
    pub async fn scan(
        &self,
        filter: &ConversationFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationRecord>, StoreError> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let remaining = limit.map(|l| l.saturating_sub(records.len()));
            if remaining == Some(0) {
                break;
            }
            let page_size = remaining.map_or(MAX_PAGE_SIZE, |r| r.min(MAX_PAGE_SIZE));
            let before = records.len();
            let page = self
                .list_conversations(filter, token.as_deref(), page_size)
                .await?;
            let fetched = page.items.len();
            records.extend(page.items.into_iter().filter(|r| filter.matches(r)));
            let dropped = fetched - (records.len() - before);
            if dropped > 0 {
                // stored timestamps outside the canonical form compare wrongly in SQL
                warn!(dropped, "Backend returned conversations outside the filter");
            }
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    /// Aggregate statistics over every conversation matching `filter`.
    pub async fn get_statistics(
        &self,
        filter: &ConversationFilter,
    ) -> Result<ConversationStatistics, StoreError> {
        let records = self.scan(filter, None).await?;
        Ok(ConversationStatistics::from_records(&records))
    }

    fn filter_query(filter: &ConversationFilter) -> Query {
        let mut query = Query::new().order_by("created_at", Direction::Descending);
        if let Some(user_type) = &filter.user_type {
            query = query.where_eq("user_type", user_type.as_str());
        }
        if let Some(key) = &filter.session_key {
            query = query.where_eq("session_key", key.as_str());
        }
        if filter.date_from.is_some() || filter.date_to.is_some() {
            let bound = |ts: &chrono::DateTime<chrono::Utc>| Value::String(timestamp::format(ts));
            query = query.where_range(
                "created_at",
                filter.date_from.as_ref().map(bound),
                filter.date_to.as_ref().map(bound),
            );
        }
        query
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationRecord>, StoreError> {
        match self.backend.get(CONVERSATIONS, id.as_str()).await? {
            Some(value) => Self::decode(Document::new(id.as_str(), value)).map(Some),
            None => Ok(None),
        }
    }

    async fn load_existing(&self, id: &ConversationId) -> Result<ConversationRecord, StoreError> {
        self.load(id)
            .await?
            .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).map_err(|e| StoreError::Corrupt {
            key: record.conversation_id.to_string(),
            reason: e.to_string(),
        })?;
        self.backend
            .put(CONVERSATIONS, record.conversation_id.as_str(), value)
            .await?;
        Ok(())
    }

    fn decode(doc: Document) -> Result<ConversationRecord, StoreError> {
        serde_json::from_value(doc.value).map_err(|e| StoreError::Corrupt {
            key: doc.key,
            reason: e.to_string(),
        })
    }
}

//! Resolution queue
//!
//! Owns the lifecycle of a `ResolutionItem`: dedup-safe creation with
//! automatic resolution above a per-kind confidence threshold, listing,
//! and the transactional resolve operation. The status transition out of
//! `pending` happens under a conditional UPDATE inside the same
//! transaction as the side effects and audit rows, so two concurrent
//! resolve calls on one item can never both succeed.

use crate::matching::similarity::normalize;
use crate::services::{side_effects, ProposalEngine};
use chrono::{DateTime, Utc};
use opsd_common::model::{
    Channel, Decision, DecisionAction, ResolutionContext, ResolutionItem, ResolutionKind,
    ResolutionStatus, SuggestedMatch, RESOLVED_VIA_SYSTEM,
};
use opsd_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bound on any multi-step transactional operation; a stalled store
/// connection fails the call instead of holding row locks
const TXN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default page size for listings
const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// A sentinel above any reachable confidence: items of this kind always
/// queue for a human
pub const NEVER_AUTO_RESOLVE: i64 = 101;

/// Conservative reference threshold for resolution kinds added later
pub const DEFAULT_AUTO_RESOLVE_THRESHOLD: i64 = 95;

/// Per-kind auto-resolve threshold
///
/// The cost of a wrong auto-resolution differs by kind: a wrongly-assigned
/// payment is revenue-critical and needs a high bar, while a proportional
/// split is inherently subjective and can never be safely automated.
pub fn auto_resolve_threshold(kind: ResolutionKind) -> i64 {
    match kind {
        ResolutionKind::CustomerMatch => 95,
        ResolutionKind::EngineerSplit => NEVER_AUTO_RESOLVE,
    }
}

/// Input for a batch create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResolutionItem {
    pub kind: ResolutionKind,
    pub source_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_match: Option<SuggestedMatch>,
    #[serde(default)]
    pub confidence: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ResolutionContext>,
}

/// Batch create outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOutcome {
    pub created: usize,
    pub auto_resolved: usize,
    pub skipped: usize,
}

/// Listing filter
#[derive(Debug, Clone)]
pub struct PendingFilter {
    pub kind: Option<ResolutionKind>,
    pub status: ResolutionStatus,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PendingFilter {
    fn default() -> Self {
        Self {
            kind: None,
            status: ResolutionStatus::Pending,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Outcome of a resolve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved { status: ResolutionStatus },
    /// `skip` leaves the item pending; nothing was written
    Skipped,
}

/// Per-kind status counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub auto_resolved: i64,
    pub confirmed: i64,
    pub rejected: i64,
}

/// Queue-wide statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub auto_resolved: i64,
    pub confirmed: i64,
    pub rejected: i64,
    pub by_kind: BTreeMap<String, StatusCounts>,
}

enum UpsertOutcome {
    Created,
    AutoResolved,
    Refreshed,
}

/// The resolution queue service
#[derive(Clone)]
pub struct ResolutionQueue {
    db: SqlitePool,
}

impl ResolutionQueue {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Upsert a batch of resolution items
    ///
    /// Items are processed in input order, each in its own transaction. An
    /// existing `(kind, source_entity)` item gets its suggestion,
    /// confidence and context refreshed but never its status: an item a
    /// human has already seen is not silently reset. New items over the
    /// kind's threshold (with a suggestion present) are resolved
    /// immediately, running the side-effect applier in the same
    /// transaction as the insert.
    ///
    /// A failing item is logged and counted `skipped`; it never aborts the
    /// rest of the batch.
    pub async fn create_items(&self, items: &[NewResolutionItem]) -> Result<CreateOutcome> {
        let mut outcome = CreateOutcome::default();

        for item in items {
            let result = tokio::time::timeout(TXN_TIMEOUT, self.upsert_item(item)).await;
            match result {
                Ok(Ok(UpsertOutcome::Created)) => outcome.created += 1,
                Ok(Ok(UpsertOutcome::AutoResolved)) => outcome.auto_resolved += 1,
                Ok(Ok(UpsertOutcome::Refreshed)) => {}
                Ok(Err(e)) => {
                    warn!(
                        kind = item.kind.as_str(),
                        source_entity = %item.source_entity,
                        error = %e,
                        "Failed to upsert resolution item, skipping"
                    );
                    outcome.skipped += 1;
                }
                Err(_) => {
                    warn!(
                        kind = item.kind.as_str(),
                        source_entity = %item.source_entity,
                        "Upsert timed out, skipping"
                    );
                    outcome.skipped += 1;
                }
            }
        }

        info!(
            created = outcome.created,
            auto_resolved = outcome.auto_resolved,
            skipped = outcome.skipped,
            "Resolution batch processed"
        );

        Ok(outcome)
    }

    async fn upsert_item(&self, item: &NewResolutionItem) -> Result<UpsertOutcome> {
        let source_entity = normalize(&item.source_entity);
        if source_entity.is_empty() {
            return Err(Error::Validation(
                "Resolution item requires a non-empty source entity".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT guid FROM resolution_items WHERE kind = ? AND source_entity = ?",
        )
        .bind(item.kind.as_str())
        .bind(&source_entity)
        .fetch_optional(&mut *tx)
        .await?;

        let suggested_json = item
            .suggested_match
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let context_json = item.context.as_ref().map(serde_json::to_string).transpose()?;

        if let Some((guid,)) = existing {
            sqlx::query(
                "UPDATE resolution_items
                 SET suggested_match = ?, confidence = ?, context = ?,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE guid = ?",
            )
            .bind(&suggested_json)
            .bind(item.confidence)
            .bind(&context_json)
            .bind(&guid)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            debug!(
                guid = %guid,
                source_entity = %source_entity,
                "Refreshed existing resolution item"
            );
            return Ok(UpsertOutcome::Refreshed);
        }

        let threshold = auto_resolve_threshold(item.kind);
        let auto = item.confidence >= threshold && item.suggested_match.is_some();

        let guid = Uuid::new_v4();
        let now = Utc::now();
        let status = if auto {
            ResolutionStatus::AutoResolved
        } else {
            ResolutionStatus::Pending
        };

        sqlx::query(
            r#"
            INSERT INTO resolution_items (
                guid, kind, source_entity, suggested_match, confidence,
                context, status, resolved_at, resolved_via, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(item.kind.as_str())
        .bind(&source_entity)
        .bind(&suggested_json)
        .bind(item.confidence)
        .bind(&context_json)
        .bind(status.as_str())
        .bind(auto.then_some(now))
        .bind(auto.then_some(RESOLVED_VIA_SYSTEM))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if auto {
            // Apply the suggestion exactly as if a human had approved it,
            // inside the same transaction as the insert
            let suggestion = item
                .suggested_match
                .clone()
                .ok_or_else(|| Error::Internal("auto-resolve without suggestion".to_string()))?;
            let decision = Decision {
                action: DecisionAction::Approve,
                customer_id: Some(suggestion.id),
                bank_name: None,
                engineer_splits: None,
            };
            let snapshot = ResolutionItem {
                id: guid,
                kind: item.kind,
                source_entity: source_entity.clone(),
                suggested_match: Some(suggestion),
                confidence: item.confidence,
                context: item.context.clone(),
                status,
                resolved_at: Some(now),
                resolved_via: Some(RESOLVED_VIA_SYSTEM.to_string()),
                created_at: now,
            };
            side_effects::apply(&mut tx, &snapshot, &decision).await?;
        }

        tx.commit().await?;

        debug!(
            guid = %guid,
            kind = item.kind.as_str(),
            source_entity = %source_entity,
            confidence = item.confidence,
            auto_resolved = auto,
            "Created resolution item"
        );

        Ok(if auto {
            UpsertOutcome::AutoResolved
        } else {
            UpsertOutcome::Created
        })
    }

    /// List items matching the filter
    ///
    /// Highest-confidence first (easiest decisions build reviewer
    /// momentum), ties break to most recent.
    pub async fn pending_items(&self, filter: &PendingFilter) -> Result<Vec<ResolutionItem>> {
        let limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let offset = filter.offset.max(0);

        let mut sql = String::from(
            "SELECT guid, kind, source_entity, suggested_match, confidence,
                    context, status, resolved_at, resolved_via, created_at
             FROM resolution_items
             WHERE status = ?",
        );
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        sql.push_str(" ORDER BY confidence DESC, created_at DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, ResolutionItemRow>(&sql).bind(filter.status.as_str());
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.db).await?;

        rows.into_iter().map(ResolutionItemRow::into_item).collect()
    }

    /// Fetch one item by id
    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<ResolutionItem>> {
        let row: Option<ResolutionItemRow> = sqlx::query_as(
            "SELECT guid, kind, source_entity, suggested_match, confidence,
                    context, status, resolved_at, resolved_via, created_at
             FROM resolution_items WHERE guid = ?",
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.map(ResolutionItemRow::into_item).transpose()
    }

    /// Resolve one item with a human decision
    ///
    /// `skip` is a pure no-op. Approve/manual/reject transition the status
    /// exactly once: the status check and write, the side effects, and the
    /// audit rows commit atomically or not at all. Of two concurrent calls
    /// on the same item, the loser observes the terminal status and fails
    /// with `AlreadyResolved`.
    pub async fn resolve_item(
        &self,
        item_id: Uuid,
        decision: &Decision,
        channel: Channel,
    ) -> Result<ResolveOutcome> {
        tokio::time::timeout(TXN_TIMEOUT, self.resolve_inner(item_id, decision, channel))
            .await
            .map_err(|_| Error::Timeout(format!("Resolve of item {} timed out", item_id)))?
    }

    async fn resolve_inner(
        &self,
        item_id: Uuid,
        decision: &Decision,
        channel: Channel,
    ) -> Result<ResolveOutcome> {
        let item = self
            .get_item(item_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Resolution item {} not found", item_id)))?;

        if item.status.is_terminal() {
            return Err(Error::AlreadyResolved(format!(
                "Resolution item {} was already handled ({})",
                item_id,
                item.status.as_str()
            )));
        }

        if decision.action == DecisionAction::Skip {
            debug!(item = %item_id, "Skip decision, item stays pending");
            return Ok(ResolveOutcome::Skipped);
        }

        let new_status = match decision.action {
            DecisionAction::Approve | DecisionAction::Manual => ResolutionStatus::Confirmed,
            DecisionAction::Reject => ResolutionStatus::Rejected,
            DecisionAction::Skip => unreachable!("skip handled above"),
        };

        let mut tx = self.db.begin().await?;

        // Claim the row: the status guard makes the transition at-most-once
        // even against a concurrent resolver
        let updated = sqlx::query(
            "UPDATE resolution_items
             SET status = ?, resolved_via = ?, resolved_at = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE guid = ? AND status = 'pending'",
        )
        .bind(new_status.as_str())
        .bind(channel.as_str())
        .bind(Utc::now())
        .bind(item_id.to_string())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Lost the race; the transaction rolls back on drop
            return Err(Error::AlreadyResolved(format!(
                "Resolution item {} was already handled",
                item_id
            )));
        }

        if matches!(
            decision.action,
            DecisionAction::Approve | DecisionAction::Manual
        ) {
            side_effects::apply(&mut tx, &item, decision).await?;
        }

        tx.commit().await?;

        info!(
            item = %item_id,
            kind = item.kind.as_str(),
            status = new_status.as_str(),
            channel = channel.as_str(),
            "Resolution recorded"
        );

        // Proposal generation is best-effort and decoupled: a failure here
        // must never surface to the caller whose resolve already committed
        let engine = ProposalEngine::new(self.db.clone());
        let decision = decision.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.consider(&item, &decision).await {
                warn!(item = %item_id, error = %e, "Proposal generation failed");
            }
        });

        Ok(ResolveOutcome::Resolved { status: new_status })
    }

    /// Queue-wide counts by status and kind
    pub async fn stats(&self) -> Result<QueueStats> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT kind, status, COUNT(*) FROM resolution_items GROUP BY kind, status",
        )
        .fetch_all(&self.db)
        .await?;

        let mut stats = QueueStats::default();
        for (kind, status, count) in rows {
            let status = ResolutionStatus::parse(&status)?;
            let entry = stats.by_kind.entry(kind).or_default();
            match status {
                ResolutionStatus::Pending => {
                    stats.pending += count;
                    entry.pending += count;
                }
                ResolutionStatus::AutoResolved => {
                    stats.auto_resolved += count;
                    entry.auto_resolved += count;
                }
                ResolutionStatus::Confirmed => {
                    stats.confirmed += count;
                    entry.confirmed += count;
                }
                ResolutionStatus::Rejected => {
                    stats.rejected += count;
                    entry.rejected += count;
                }
            }
        }

        Ok(stats)
    }
}

/// Raw row shape; JSON columns and enums are parsed in `into_item`
#[derive(sqlx::FromRow)]
struct ResolutionItemRow {
    guid: String,
    kind: String,
    source_entity: String,
    suggested_match: Option<String>,
    confidence: i64,
    context: Option<String>,
    status: String,
    resolved_at: Option<DateTime<Utc>>,
    resolved_via: Option<String>,
    created_at: DateTime<Utc>,
}

impl ResolutionItemRow {
    fn into_item(self) -> Result<ResolutionItem> {
        let id = Uuid::parse_str(&self.guid)
            .map_err(|e| Error::Internal(format!("Invalid item GUID in database: {}", e)))?;
        let suggested_match = self
            .suggested_match
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let context = self.context.as_deref().map(serde_json::from_str).transpose()?;

        Ok(ResolutionItem {
            id,
            kind: ResolutionKind::parse(&self.kind)?,
            source_entity: self.source_entity,
            suggested_match,
            confidence: self.confidence,
            context,
            status: ResolutionStatus::parse(&self.status)?,
            resolved_at: self.resolved_at,
            resolved_via: self.resolved_via,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_per_kind() {
        assert_eq!(auto_resolve_threshold(ResolutionKind::CustomerMatch), 95);
        assert_eq!(
            auto_resolve_threshold(ResolutionKind::EngineerSplit),
            NEVER_AUTO_RESOLVE
        );
        // the split threshold must be unreachable even by a perfect score
        assert!(auto_resolve_threshold(ResolutionKind::EngineerSplit) > 100);
    }
}

//! Proposal engine
//!
//! Watches committed resolution decisions for repeatable patterns and
//! stages them as proposals: an approved customer match whose counterparty
//! string the customer does not yet recognize becomes an alias proposal, a
//! rejected suggestion becomes a suppression proposal. Runs after the
//! resolving transaction commits, never inside it.
//!
//! Approving a proposal activates it as a `SystemRule` and applies its
//! one-time side effect in the same transaction.

use crate::matching::similarity::{fold, normalize};
use crate::services::side_effects::record_audit;
use chrono::{DateTime, Utc};
use opsd_common::model::{
    Decision, DecisionAction, ProposalKind, ProposalPayload, ProposalStatus, ResolutionItem,
    ResolutionKind, SystemProposal, SystemRule,
};
use opsd_common::{Error, Result};
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

/// The proposal engine service
#[derive(Clone)]
pub struct ProposalEngine {
    db: SqlitePool,
}

impl ProposalEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Inspect a recorded decision for a pattern worth staging
    ///
    /// Engineer splits are inherently situational and never produce a
    /// proposal.
    pub async fn consider(&self, item: &ResolutionItem, decision: &Decision) -> Result<()> {
        match decision.action {
            DecisionAction::Approve | DecisionAction::Manual
                if item.kind == ResolutionKind::CustomerMatch =>
            {
                self.consider_alias(item, decision).await
            }
            DecisionAction::Reject => self.consider_suppression(item).await,
            _ => Ok(()),
        }
    }

    /// Stage an alias proposal when the approved customer does not yet
    /// recognize the counterparty string
    async fn consider_alias(&self, item: &ResolutionItem, decision: &Decision) -> Result<()> {
        let Some(customer_id) = decision
            .customer_id
            .or_else(|| item.suggested_match.as_ref().map(|s| s.id))
        else {
            return Ok(());
        };

        let customer: Option<(String, Option<String>, String)> =
            sqlx::query_as("SELECT name, bank_name, aliases FROM customers WHERE guid = ?")
                .bind(customer_id.to_string())
                .fetch_optional(&self.db)
                .await?;
        let Some((name, bank_name, aliases_json)) = customer else {
            return Ok(());
        };
        let aliases: Vec<String> = serde_json::from_str(&aliases_json)?;

        let candidate = normalize(&item.source_entity);
        let pattern = fold(&candidate);
        let recognized = fold(&name) == pattern
            || bank_name.as_deref().is_some_and(|b| fold(b) == pattern)
            || aliases.iter().any(|a| fold(a) == pattern);
        if recognized {
            return Ok(());
        }

        if self.pending_exists(ProposalKind::Alias, &pattern).await? {
            debug!(pattern = %pattern, "Pending alias proposal already staged");
            return Ok(());
        }

        self.insert_proposal(
            ProposalKind::Alias,
            format!("Recognize \"{}\" as {}", candidate, name),
            json!({
                "source_entity": item.source_entity,
                "customer_id": customer_id,
                "decision": decision.action,
            }),
            &ProposalPayload::Alias {
                customer_id,
                alias: candidate,
            },
            &pattern,
            Some(item.id),
        )
        .await
    }

    /// Stage a suppression proposal so a rejected suggestion is not offered
    /// again for the same source string
    async fn consider_suppression(&self, item: &ResolutionItem) -> Result<()> {
        let Some(suggested) = item.suggested_match.as_ref() else {
            return Ok(());
        };

        let pattern = format!("{}|{}", fold(&item.source_entity), suggested.id);
        if self
            .pending_exists(ProposalKind::Suppression, &pattern)
            .await?
        {
            debug!(pattern = %pattern, "Pending suppression proposal already staged");
            return Ok(());
        }

        self.insert_proposal(
            ProposalKind::Suppression,
            format!(
                "Stop suggesting {} for \"{}\"",
                suggested.label, item.source_entity
            ),
            json!({
                "source_entity": item.source_entity,
                "rejected_target": suggested.id,
                "suggested_confidence": suggested.confidence,
            }),
            &ProposalPayload::Suppression {
                source_entity: normalize(&item.source_entity),
                target_id: suggested.id,
                target_label: suggested.label.clone(),
            },
            &pattern,
            Some(item.id),
        )
        .await
    }

    /// At most one pending proposal per (kind, normalized pattern)
    async fn pending_exists(&self, kind: ProposalKind, pattern: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM system_proposals
             WHERE kind = ? AND status = 'pending' AND pattern = ?",
        )
        .bind(kind.as_str())
        .bind(pattern)
        .fetch_one(&self.db)
        .await?;
        Ok(count.0 > 0)
    }

    async fn insert_proposal(
        &self,
        kind: ProposalKind,
        description: String,
        evidence: serde_json::Value,
        payload: &ProposalPayload,
        pattern: &str,
        source_item_id: Option<Uuid>,
    ) -> Result<()> {
        let guid = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO system_proposals (
                guid, kind, description, evidence, payload, pattern,
                status, source_item_id
            )
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(kind.as_str())
        .bind(&description)
        .bind(evidence.to_string())
        .bind(serde_json::to_string(payload)?)
        .bind(pattern)
        .bind(source_item_id.map(|id| id.to_string()))
        .execute(&self.db)
        .await?;

        info!(
            proposal = %guid,
            kind = kind.as_str(),
            description = %description,
            "Staged system proposal"
        );
        Ok(())
    }

    /// List proposals by status
    pub async fn list_proposals(&self, status: ProposalStatus) -> Result<Vec<SystemProposal>> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            "SELECT guid, kind, description, evidence, payload, pattern,
                    status, source_item_id, created_at, resolved_at
             FROM system_proposals
             WHERE status = ?
             ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ProposalRow::into_proposal).collect()
    }

    /// Approve or reject a proposal
    ///
    /// Approval activates a `SystemRule` with the proposal's payload and
    /// applies the rule's immediate one-time side effect, all in one
    /// transaction.
    pub async fn resolve_proposal(&self, id: Uuid, approve: bool) -> Result<ProposalStatus> {
        let mut tx = self.db.begin().await?;

        let row: Option<ProposalRow> = sqlx::query_as(
            "SELECT guid, kind, description, evidence, payload, pattern,
                    status, source_item_id, created_at, resolved_at
             FROM system_proposals WHERE guid = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        let proposal = row
            .ok_or_else(|| Error::NotFound(format!("Proposal {} not found", id)))?
            .into_proposal()?;

        if proposal.status != ProposalStatus::Pending {
            return Err(Error::AlreadyResolved(format!(
                "Proposal {} was already {}",
                id,
                proposal.status.as_str()
            )));
        }

        let new_status = if approve {
            ProposalStatus::Approved
        } else {
            ProposalStatus::Rejected
        };

        let updated = sqlx::query(
            "UPDATE system_proposals
             SET status = ?, resolved_at = ?
             WHERE guid = ? AND status = 'pending'",
        )
        .bind(new_status.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::AlreadyResolved(format!(
                "Proposal {} was already handled",
                id
            )));
        }

        if approve {
            let rule_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO system_rules (guid, kind, payload, active, source_proposal_id)
                 VALUES (?, ?, ?, 1, ?)",
            )
            .bind(rule_id.to_string())
            .bind(proposal.kind.as_str())
            .bind(serde_json::to_string(&proposal.payload)?)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

            apply_rule_effect(&mut tx, &proposal).await?;

            info!(
                proposal = %id,
                rule = %rule_id,
                kind = proposal.kind.as_str(),
                "Proposal approved, rule activated"
            );
        } else {
            info!(proposal = %id, "Proposal rejected");
        }

        tx.commit().await?;
        Ok(new_status)
    }
}

/// One-time side effect of an approved rule
///
/// An alias rule takes effect immediately instead of waiting for the next
/// matching pass; the other kinds act purely as matcher inputs.
async fn apply_rule_effect(
    tx: &mut Transaction<'_, Sqlite>,
    proposal: &SystemProposal,
) -> Result<()> {
    let ProposalPayload::Alias { customer_id, alias } = &proposal.payload else {
        return Ok(());
    };

    let customer: Option<(String,)> =
        sqlx::query_as("SELECT aliases FROM customers WHERE guid = ?")
            .bind(customer_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
    let (aliases_json,) = customer
        .ok_or_else(|| Error::NotFound(format!("Customer {} not found", customer_id)))?;
    let mut aliases: Vec<String> = serde_json::from_str(&aliases_json)?;

    if aliases.iter().any(|a| fold(a) == fold(alias)) {
        return Ok(());
    }

    let old_json = serde_json::to_string(&aliases)?;
    aliases.push(alias.clone());
    let new_json = serde_json::to_string(&aliases)?;

    sqlx::query("UPDATE customers SET aliases = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(&new_json)
        .bind(customer_id.to_string())
        .execute(&mut **tx)
        .await?;

    if let Some(item_id) = proposal.source_item_id {
        record_audit(
            tx,
            item_id,
            "customer",
            &customer_id.to_string(),
            "aliases",
            Some(old_json),
            Some(new_json),
        )
        .await?;
    }

    Ok(())
}

/// Raw row shape; JSON columns and enums are parsed in `into_proposal`
#[derive(sqlx::FromRow)]
struct ProposalRow {
    guid: String,
    kind: String,
    description: String,
    evidence: String,
    payload: String,
    pattern: String,
    status: String,
    source_item_id: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl ProposalRow {
    fn into_proposal(self) -> Result<SystemProposal> {
        let id = Uuid::parse_str(&self.guid)
            .map_err(|e| Error::Internal(format!("Invalid proposal GUID in database: {}", e)))?;
        let source_item_id = self
            .source_item_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid source item GUID: {}", e)))?;

        Ok(SystemProposal {
            id,
            kind: ProposalKind::parse(&self.kind)?,
            description: self.description,
            evidence: serde_json::from_str(&self.evidence)?,
            payload: serde_json::from_str(&self.payload)?,
            pattern: self.pattern,
            status: ProposalStatus::parse(&self.status)?,
            source_item_id,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

/// Parse a stored rule row into a `SystemRule`
pub(crate) fn rule_from_row(
    guid: &str,
    kind: &str,
    payload: &str,
    active: bool,
    source_proposal_id: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<SystemRule> {
    Ok(SystemRule {
        id: Uuid::parse_str(guid)
            .map_err(|e| Error::Internal(format!("Invalid rule GUID in database: {}", e)))?,
        kind: ProposalKind::parse(kind)?,
        payload: serde_json::from_str(payload)?,
        active,
        source_proposal_id: source_proposal_id
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid proposal GUID: {}", e)))?,
        created_at,
    })
}

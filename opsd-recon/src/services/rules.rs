//! Active rule loaders
//!
//! Projects `system_rules` rows into the typed inputs matchers consume.
//! Rules are append-mostly; soft deactivation is the only mutation.

use crate::services::proposal_engine::rule_from_row;
use chrono::{DateTime, Utc};
use opsd_common::model::{
    DomainMapping, ProposalKind, ProposalPayload, SuppressionRule, SystemRule, VendorRule,
};
use opsd_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

async fn active_rules(db: &SqlitePool, kind: ProposalKind) -> Result<Vec<SystemRule>> {
    let rows: Vec<(String, String, String, bool, Option<String>, DateTime<Utc>)> = sqlx::query_as(
        "SELECT guid, kind, payload, active, source_proposal_id, created_at
         FROM system_rules
         WHERE kind = ? AND active = 1
         ORDER BY created_at",
    )
    .bind(kind.as_str())
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(guid, kind, payload, active, source, created_at)| {
            rule_from_row(&guid, &kind, &payload, active, source.as_deref(), created_at)
        })
        .collect()
}

/// Active vendor-pattern rules for `categorize_vendor`
pub async fn active_vendor_rules(db: &SqlitePool) -> Result<Vec<VendorRule>> {
    let rules = active_rules(db, ProposalKind::VendorPattern).await?;
    Ok(rules
        .into_iter()
        .filter_map(|rule| match rule.payload {
            ProposalPayload::VendorPattern { pattern, category } => Some(VendorRule {
                id: rule.id,
                pattern,
                category,
            }),
            _ => None,
        })
        .collect())
}

/// Active suppression rules for the customer matchers
pub async fn active_suppressions(db: &SqlitePool) -> Result<Vec<SuppressionRule>> {
    let rules = active_rules(db, ProposalKind::Suppression).await?;
    Ok(rules
        .into_iter()
        .filter_map(|rule| match rule.payload {
            ProposalPayload::Suppression {
                source_entity,
                target_id,
                ..
            } => Some(SuppressionRule {
                source_entity,
                target_id,
            }),
            _ => None,
        })
        .collect())
}

/// Active explicit domain mappings for `classify_domain`
pub async fn active_domain_mappings(db: &SqlitePool) -> Result<Vec<DomainMapping>> {
    let rules = active_rules(db, ProposalKind::DomainMapping).await?;
    Ok(rules
        .into_iter()
        .filter_map(|rule| match rule.payload {
            ProposalPayload::DomainMapping {
                domain,
                meeting_kind,
                customer_id,
            } => Some(DomainMapping {
                domain,
                meeting_kind,
                customer_id,
            }),
            _ => None,
        })
        .collect())
}

/// Soft-deactivate a rule
pub async fn deactivate_rule(db: &SqlitePool, rule_id: Uuid) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE system_rules SET active = 0, deactivated_at = ?
         WHERE guid = ? AND active = 1",
    )
    .bind(Utc::now())
    .bind(rule_id.to_string())
    .execute(db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Active rule {} not found",
            rule_id
        )));
    }

    info!(rule = %rule_id, "Rule deactivated");
    Ok(())
}

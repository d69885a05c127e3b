//! Side-effect appliers
//!
//! Applies an accepted resolution decision to the canonical records. Only
//! ever invoked from inside the resolution queue's transaction (auto-resolve
//! or manual resolve path); each mutated field gets one audit row in the
//! same transaction. Validation runs before the first write, so a rejected
//! decision never leaves partial state behind.

use crate::matching::similarity::{fold, normalize};
use chrono::NaiveDate;
use opsd_common::db::models::BankTransaction;
use opsd_common::model::{Decision, EngineerSplit, ResolutionContext, ResolutionItem, ResolutionKind};
use opsd_common::{Error, Result};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

/// Apply the kind-specific side effect for an accepted decision
pub async fn apply(
    tx: &mut Transaction<'_, Sqlite>,
    item: &ResolutionItem,
    decision: &Decision,
) -> Result<()> {
    match item.kind {
        ResolutionKind::CustomerMatch => apply_customer_match(tx, item, decision).await,
        ResolutionKind::EngineerSplit => apply_engineer_split(tx, item, decision).await,
    }
}

/// Assign matching unreconciled incoming transactions to the decided
/// customer, and learn the counterparty string as the customer's bank name
/// or as a new alias so the next identical string matches without a fuzzy
/// search.
async fn apply_customer_match(
    tx: &mut Transaction<'_, Sqlite>,
    item: &ResolutionItem,
    decision: &Decision,
) -> Result<()> {
    let customer_id = decision
        .customer_id
        .or_else(|| item.suggested_match.as_ref().map(|s| s.id))
        .ok_or_else(|| {
            Error::Validation("customer_match decision requires a customer id".to_string())
        })?;

    // Validate the target before any write
    let customer: Option<(String, Option<String>, String)> =
        sqlx::query_as("SELECT name, bank_name, aliases FROM customers WHERE guid = ?")
            .bind(customer_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
    let (name, bank_name, aliases_json) = customer
        .ok_or_else(|| Error::NotFound(format!("Customer {} not found", customer_id)))?;
    let mut aliases: Vec<String> = serde_json::from_str(&aliases_json)?;

    // Reassign every unreconciled incoming transaction whose counterparty
    // contains the source string
    let transactions: Vec<BankTransaction> = sqlx::query_as(
        "SELECT guid, counterparty, amount, posted_at, customer_id, is_reconciled,
                settlement_month
         FROM bank_transactions
         WHERE is_reconciled = 0 AND amount > 0
           AND instr(lower(counterparty), lower(?)) > 0",
    )
    .bind(&item.source_entity)
    .fetch_all(&mut **tx)
    .await?;

    let reassigned = transactions.len();
    for txn in transactions {
        let month = settlement_month(&txn.posted_at)?;
        sqlx::query(
            "UPDATE bank_transactions
             SET customer_id = ?, is_reconciled = 1, settlement_month = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE guid = ?",
        )
        .bind(customer_id.to_string())
        .bind(&month)
        .bind(&txn.guid)
        .execute(&mut **tx)
        .await?;

        record_audit(
            tx,
            item.id,
            "bank_transaction",
            &txn.guid,
            "customer_id",
            txn.customer_id,
            Some(customer_id.to_string()),
        )
        .await?;
    }

    // Learn the mapping: first occurrence becomes the bank name, later
    // variants accumulate as aliases
    let learned = decision
        .bank_name
        .as_deref()
        .map(normalize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| normalize(&item.source_entity));

    let existing_bank = bank_name
        .clone()
        .filter(|s| !s.trim().is_empty());
    match existing_bank {
        None => {
            sqlx::query(
                "UPDATE customers SET bank_name = ?, updated_at = CURRENT_TIMESTAMP
                 WHERE guid = ?",
            )
            .bind(&learned)
            .bind(customer_id.to_string())
            .execute(&mut **tx)
            .await?;

            record_audit(
                tx,
                item.id,
                "customer",
                &customer_id.to_string(),
                "bank_name",
                bank_name,
                Some(learned.clone()),
            )
            .await?;
        }
        Some(existing) => {
            let known = fold(&existing) == fold(&learned)
                || fold(&name) == fold(&learned)
                || aliases.iter().any(|a| fold(a) == fold(&learned));
            if !known {
                let old_json = serde_json::to_string(&aliases)?;
                aliases.push(learned.clone());
                let new_json = serde_json::to_string(&aliases)?;

                sqlx::query(
                    "UPDATE customers SET aliases = ?, updated_at = CURRENT_TIMESTAMP
                     WHERE guid = ?",
                )
                .bind(&new_json)
                .bind(customer_id.to_string())
                .execute(&mut **tx)
                .await?;

                record_audit(
                    tx,
                    item.id,
                    "customer",
                    &customer_id.to_string(),
                    "aliases",
                    Some(old_json),
                    Some(new_json),
                )
                .await?;
            }
        }
    }

    debug!(
        item = %item.id,
        customer = %customer_id,
        reassigned,
        "Applied customer match"
    );

    Ok(())
}

/// Distribute each referenced transaction's absolute amount across the
/// decided splits, proportional to each split's share of the decided
/// total. One attribution row per (transaction, team member), upserted.
async fn apply_engineer_split(
    tx: &mut Transaction<'_, Sqlite>,
    item: &ResolutionItem,
    decision: &Decision,
) -> Result<()> {
    let splits = decision
        .engineer_splits
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::Validation("engineer_split decision requires at least one split".to_string())
        })?;

    if splits
        .iter()
        .any(|s| !s.amount.is_finite() || s.amount <= 0.0)
    {
        return Err(Error::Validation(
            "Split amounts must be positive".to_string(),
        ));
    }
    let split_total: f64 = splits.iter().map(|s| s.amount).sum();

    let Some(ResolutionContext::EngineerSplit {
        transaction_ids,
        total_amount,
    }) = item.context.as_ref()
    else {
        return Err(Error::Validation(
            "engineer_split item is missing its split context".to_string(),
        ));
    };

    if (split_total - total_amount).abs() > 0.01 {
        warn!(
            item = %item.id,
            split_total,
            total_amount,
            "Decided split total differs from the queued total"
        );
    }

    // Validate all referenced team members before the first write
    for split in splits {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM team_members WHERE guid = ?")
            .bind(split.team_member_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!(
                "Team member {} not found",
                split.team_member_id
            )));
        }
    }

    for txn_id in transaction_ids {
        let row: Option<BankTransaction> = sqlx::query_as(
            "SELECT guid, counterparty, amount, posted_at, customer_id, is_reconciled,
                    settlement_month
             FROM bank_transactions WHERE guid = ?",
        )
        .bind(txn_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
        let txn = row.ok_or_else(|| {
            Error::NotFound(format!("Bank transaction {} not found", txn_id))
        })?;
        let month = settlement_month(&txn.posted_at)?;

        for split in splits {
            let share = split.amount / split_total;
            let attributed = txn.amount.abs() * share;
            upsert_attribution(tx, item.id, *txn_id, split, attributed, &month).await?;
        }
    }

    debug!(
        item = %item.id,
        transactions = transaction_ids.len(),
        splits = splits.len(),
        "Applied engineer split"
    );

    Ok(())
}

async fn upsert_attribution(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: Uuid,
    txn_id: Uuid,
    split: &EngineerSplit,
    attributed: f64,
    month: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payment_attributions (
            transaction_id, team_member_id, amount, settlement_month
        )
        VALUES (?, ?, ?, ?)
        ON CONFLICT(transaction_id, team_member_id)
        DO UPDATE SET amount = excluded.amount,
                      settlement_month = excluded.settlement_month,
                      updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(txn_id.to_string())
    .bind(split.team_member_id.to_string())
    .bind(attributed)
    .bind(month)
    .execute(&mut **tx)
    .await?;

    record_audit(
        tx,
        item_id,
        "payment_attribution",
        &format!("{}:{}", txn_id, split.team_member_id),
        "amount",
        None,
        Some(format!("{:.2}", attributed)),
    )
    .await
}

/// `YYYY-MM` settlement month from an ISO posted date
fn settlement_month(posted_at: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(posted_at, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Invalid posted date {:?}: {}", posted_at, e)))?;
    Ok(date.format("%Y-%m").to_string())
}

/// One audit row per mutated field, written inside the caller's transaction
pub(crate) async fn record_audit(
    tx: &mut Transaction<'_, Sqlite>,
    resolution_item_id: Uuid,
    entity_type: &str,
    entity_id: &str,
    field: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (
            resolution_item_id, entity_type, entity_id, field, old_value, new_value
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resolution_item_id.to_string())
    .bind(entity_type)
    .bind(entity_id)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_month() {
        assert_eq!(settlement_month("2026-03-14").unwrap(), "2026-03");
        assert_eq!(settlement_month("2025-12-01").unwrap(), "2025-12");
        assert!(settlement_month("03/14/2026").is_err());
    }
}

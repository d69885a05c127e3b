//! Database row models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub guid: String,
    pub name: String,
    pub bank_name: Option<String>,
    /// JSON array of alternate identifiers
    pub aliases: String,
    pub email_domain: Option<String>,
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub guid: String,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BankTransaction {
    pub guid: String,
    pub counterparty: String,
    pub amount: f64,
    /// ISO date the bank posted the transaction
    pub posted_at: String,
    pub customer_id: Option<String>,
    pub is_reconciled: bool,
    /// `YYYY-MM`, stamped at reconciliation time
    pub settlement_month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentAttribution {
    pub id: i64,
    pub transaction_id: String,
    pub team_member_id: String,
    pub amount: f64,
    pub settlement_month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub resolution_item_id: Option<String>,
    pub entity_type: String,
    pub entity_id: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

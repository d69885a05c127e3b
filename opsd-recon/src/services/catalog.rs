//! Canonical entity snapshots for matcher input
//!
//! Read-only projections of the customer and team-member tables; matchers
//! never touch the tables directly.

use opsd_common::db::models::{Customer, TeamMember};
use opsd_common::model::{MatchableCustomer, MatchableTeamMember};
use opsd_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Load the customer candidate pool
pub async fn matchable_customers(db: &SqlitePool) -> Result<Vec<MatchableCustomer>> {
    let rows: Vec<Customer> = sqlx::query_as(
        "SELECT guid, name, bank_name, aliases, email_domain, sheet_name
         FROM customers ORDER BY name",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(MatchableCustomer {
                id: parse_guid(&row.guid)?,
                name: row.name,
                bank_name: row.bank_name,
                aliases: serde_json::from_str(&row.aliases)?,
                email_domain: row.email_domain,
                sheet_name: row.sheet_name,
            })
        })
        .collect()
}

/// Load active team members
pub async fn matchable_team_members(db: &SqlitePool) -> Result<Vec<MatchableTeamMember>> {
    let rows: Vec<TeamMember> = sqlx::query_as(
        "SELECT guid, name, email, active FROM team_members WHERE active = 1 ORDER BY name",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(MatchableTeamMember {
                id: parse_guid(&row.guid)?,
                name: row.name,
            })
        })
        .collect()
}

fn parse_guid(guid: &str) -> Result<Uuid> {
    Uuid::parse_str(guid)
        .map_err(|e| Error::Internal(format!("Invalid GUID in database: {}", e)))
}

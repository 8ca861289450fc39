use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expiry::{ExpiryFlags, ExpiryStage, days_until};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub company_id: Uuid,
    pub license_type: String,
    pub license_number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub flags: ExpiryFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        days_until(self.expiry_date, today)
    }

    pub fn stage(&self, today: NaiveDate) -> Option<ExpiryStage> {
        ExpiryStage::for_days_left(self.days_left(today))
    }

    pub fn label(&self) -> String {
        format!("{} #{}", self.license_type, self.license_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInput {
    pub worker_id: Uuid,
    pub license_type: String,
    pub license_number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
}

impl LicenseInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.license_type.trim().is_empty() {
            return Err("License type is required".to_string());
        }
        if self.license_number.trim().is_empty() {
            return Err("License number is required".to_string());
        }
        validate_dates(self.issue_date, Some(self.expiry_date))
    }
}

/// Expiry must fall strictly after issue when both are known.
pub fn validate_dates(
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
) -> Result<(), String> {
    match (issue_date, expiry_date) {
        (Some(issue), Some(expiry)) if expiry <= issue => Err(format!(
            "Expiry date {} must be after issue date {}",
            expiry, issue
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseFilter {
    pub worker_id: Option<Uuid>,
    pub expiring_within_days: Option<i64>,
    pub expired: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

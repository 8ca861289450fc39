use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expiry::{ExpiryFlags, ExpiryStage, days_until};
use super::license::validate_dates;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDocument {
    pub id: Uuid,
    pub company_id: Uuid,
    pub document_type: String,
    pub title: String,
    pub document_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub file_url: Option<String>,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub flags: ExpiryFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyDocument {
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|expiry| days_until(expiry, today))
    }

    pub fn stage(&self, today: NaiveDate) -> Option<ExpiryStage> {
        self.days_left(today).and_then(ExpiryStage::for_days_left)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDocumentInput {
    pub document_type: String,
    pub title: String,
    pub document_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub file_url: Option<String>,
    pub notes: Option<String>,
}

impl CompanyDocumentInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.document_type.trim().is_empty() {
            return Err("Document type is required".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Document title is required".to_string());
        }
        validate_dates(self.issue_date, self.expiry_date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub document_type: Option<String>,
    pub expiring_within_days: Option<i64>,
    pub expired: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

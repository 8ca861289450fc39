use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    /// Alert windows ordered from the widest to the tightest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum ExpiryStage {
        Days180 => "180_days",
        Days90 => "90_days",
        Days30 => "30_days",
        Days7 => "7_days",
        Expired => "expired",
    }
}

impl ExpiryStage {
    /// Upper bound of the window in days. `None` for `Expired`.
    pub fn threshold_days(&self) -> Option<i64> {
        match self {
            ExpiryStage::Days180 => Some(180),
            ExpiryStage::Days90 => Some(90),
            ExpiryStage::Days30 => Some(30),
            ExpiryStage::Days7 => Some(7),
            ExpiryStage::Expired => None,
        }
    }

    /// Tightest window containing `days_left`, `None` beyond 180 days.
    pub fn for_days_left(days_left: i64) -> Option<Self> {
        match days_left {
            d if d < 0 => Some(ExpiryStage::Expired),
            0..=7 => Some(ExpiryStage::Days7),
            8..=30 => Some(ExpiryStage::Days30),
            31..=90 => Some(ExpiryStage::Days90),
            91..=180 => Some(ExpiryStage::Days180),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ExpiryStage::Days180 => "Expires within 180 days",
            ExpiryStage::Days90 => "Expires within 90 days",
            ExpiryStage::Days30 => "Expires within 30 days",
            ExpiryStage::Days7 => "Expires within 7 days",
            ExpiryStage::Expired => "Expired",
        }
    }
}

/// Longest window tracked by the scanner.
pub const MAX_TRACKED_DAYS: i64 = 180;

/// Widest `expiringWithinDays` list filter, about ten years.
pub const MAX_FILTER_DAYS: i64 = 3660;

pub fn validate_window(days: Option<i64>) -> Result<(), String> {
    match days {
        Some(d) if d < 0 => Err("expiringWithinDays must not be negative".to_string()),
        Some(d) if d > MAX_FILTER_DAYS => Err(format!(
            "expiringWithinDays must be at most {}",
            MAX_FILTER_DAYS
        )),
        _ => Ok(()),
    }
}

/// Last day of a `days` long window opening on `today`. Saturates at the calendar end.
pub fn horizon(today: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days.max(0))
        .and_then(|span| today.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX)
}

pub fn days_until(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiry_date - today).num_days()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Per-stage "already notified" booleans stored on licenses and documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryFlags {
    pub notified_180_days: bool,
    pub notified_90_days: bool,
    pub notified_30_days: bool,
    pub notified_7_days: bool,
    pub notified_expired: bool,
}

impl ExpiryFlags {
    pub fn is_sent(&self, stage: ExpiryStage) -> bool {
        match stage {
            ExpiryStage::Days180 => self.notified_180_days,
            ExpiryStage::Days90 => self.notified_90_days,
            ExpiryStage::Days30 => self.notified_30_days,
            ExpiryStage::Days7 => self.notified_7_days,
            ExpiryStage::Expired => self.notified_expired,
        }
    }

    fn set(&mut self, stage: ExpiryStage) {
        match stage {
            ExpiryStage::Days180 => self.notified_180_days = true,
            ExpiryStage::Days90 => self.notified_90_days = true,
            ExpiryStage::Days30 => self.notified_30_days = true,
            ExpiryStage::Days7 => self.notified_7_days = true,
            ExpiryStage::Expired => self.notified_expired = true,
        }
    }

    /// Mark `stage` and every wider stage as sent.
    pub fn mark_through(&mut self, stage: ExpiryStage) {
        for candidate in ExpiryStage::ALL {
            if *candidate <= stage {
                self.set(*candidate);
            }
        }
    }

    /// Stage that should fire now, if its notification has not gone out yet.
    pub fn due_stage(&self, days_left: i64) -> Option<ExpiryStage> {
        ExpiryStage::for_days_left(days_left).filter(|stage| !self.is_sent(*stage))
    }

    pub fn is_complete(&self) -> bool {
        ExpiryStage::ALL.iter().all(|stage| self.is_sent(*stage))
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum TrackedKind {
        License => "license",
        CompanyDocument => "company_document",
    }
}

/// A license or document row as loaded by the scanner.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExpiryCandidate {
    pub id: Uuid,
    pub company_id: Uuid,
    pub label: String,
    pub expiry_date: NaiveDate,
    #[sqlx(flatten)]
    pub flags: ExpiryFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingExpiry {
    pub kind: TrackedKind,
    pub id: Uuid,
    pub label: String,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
    pub stage: Option<ExpiryStage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub licenses_checked: usize,
    pub documents_checked: usize,
    pub notifications_created: usize,
    /// Candidates whose expiry date changed mid-scan
    pub skipped: usize,
    pub failures: usize,
}

use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::{
    models::{
        Action, ActivityType, CreateNotificationInput, EntityType, ExpiryCandidate, ExpiryFlags,
        ExpiryStage, MAX_TRACKED_DAYS, NotificationKind, ScanReport, TrackedKind, UpcomingExpiry,
        days_until, horizon,
    },
    repositories::{
        document as document_repo, license as license_repo, notification as notification_repo,
    },
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::services::activity_logger;

/// What the scanner will write for one record
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAlert {
    pub stage: ExpiryStage,
    pub days_left: i64,
    pub flags: ExpiryFlags,
    pub notification: CreateNotificationInput,
}

impl TrackedKind {
    fn entity_type(&self) -> &'static str {
        match self {
            TrackedKind::License => EntityType::LICENSE,
            TrackedKind::CompanyDocument => EntityType::COMPANY_DOCUMENT,
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            TrackedKind::License => "License",
            TrackedKind::CompanyDocument => "Document",
        }
    }
}

/// Decide whether `candidate` needs an alert today. Returns `None` when nothing is due.
pub fn plan_alert(
    kind: TrackedKind,
    candidate: &ExpiryCandidate,
    today: NaiveDate,
) -> Option<PlannedAlert> {
    let days_left = days_until(candidate.expiry_date, today);
    let stage = candidate.flags.due_stage(days_left)?;

    let mut flags = candidate.flags;
    flags.mark_through(stage);

    let (notification_kind, message) = match stage {
        ExpiryStage::Expired => (
            NotificationKind::Expired,
            format!(
                "{} '{}' expired on {}",
                kind.noun(),
                candidate.label,
                candidate.expiry_date
            ),
        ),
        _ => (
            NotificationKind::ExpiryWarning,
            format!(
                "{} '{}' expires on {} ({} days left)",
                kind.noun(),
                candidate.label,
                candidate.expiry_date,
                days_left
            ),
        ),
    };

    Some(PlannedAlert {
        stage,
        days_left,
        flags,
        notification: CreateNotificationInput {
            company_id: candidate.company_id,
            user_id: None,
            kind: notification_kind,
            title: format!("{}: {}", stage.title(), candidate.label),
            message,
            entity_type: Some(kind.entity_type().to_string()),
            entity_id: Some(candidate.id),
        },
    })
}

/// Result of handling one scanner candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    NotDue,
    Sent(ExpiryStage),
    /// The expiry date moved after the candidate was loaded. Nothing was written.
    Renewed,
}

/// Flags are claimed before anything else is written, so a renewal that lands
/// between load and write leaves no notification behind.
async fn apply_alert(
    kind: TrackedKind,
    record_id: Uuid,
    expiry_date: NaiveDate,
    alert: PlannedAlert,
) -> Result<bool, AppError> {
    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let claimed = match kind {
                TrackedKind::License => {
                    license_repo::update_flags(tx, record_id, expiry_date, &alert.flags).await?
                }
                TrackedKind::CompanyDocument => {
                    document_repo::update_flags(tx, record_id, expiry_date, &alert.flags).await?
                }
            };
            if !claimed {
                return Ok(false);
            }

            let notification = notification_repo::create_notification(tx, &alert.notification).await?;

            let metadata = activity_logger::metadata(vec![
                ("stage", alert.stage.to_string()),
                ("days_left", alert.days_left.to_string()),
                ("notification_id", notification.id.to_string()),
            ]);
            activity_logger::log_activity(
                tx,
                alert.notification.company_id,
                None,
                ActivityType::SYSTEM,
                kind.entity_type(),
                record_id,
                Action::EXPIRY_ALERT,
                alert.notification.message.clone(),
                Some(metadata),
                None,
            )
            .await?;

            Ok(true)
        })
    })
    .await
}

pub async fn process_candidate(
    kind: TrackedKind,
    candidate: &ExpiryCandidate,
    today: NaiveDate,
) -> Result<AlertOutcome, AppError> {
    let Some(alert) = plan_alert(kind, candidate, today) else {
        return Ok(AlertOutcome::NotDue);
    };
    let stage = alert.stage;

    if apply_alert(kind, candidate.id, candidate.expiry_date, alert).await? {
        Ok(AlertOutcome::Sent(stage))
    } else {
        Ok(AlertOutcome::Renewed)
    }
}

async fn scan_candidates(
    kind: TrackedKind,
    candidates: &[ExpiryCandidate],
    today: NaiveDate,
    report: &mut ScanReport,
) {
    for candidate in candidates {
        match process_candidate(kind, candidate, today).await {
            Ok(AlertOutcome::NotDue) => {}
            Ok(AlertOutcome::Sent(_)) => report.notifications_created += 1,
            Ok(AlertOutcome::Renewed) => {
                report.skipped += 1;
                log::debug!("{} {} renewed during scan, alert dropped", kind, candidate.id);
            }
            Err(e) => {
                report.failures += 1;
                log::error!("Expiry alert failed for {} {}: {}", kind, candidate.id, e);
            }
        }
    }
}

/// One pass over tracked licenses and documents. `company_id` limits the pass
/// to a single company; the background loop passes `None`.
pub async fn scan(today: NaiveDate, company_id: Option<Uuid>) -> Result<ScanReport, AppError> {
    let horizon = horizon(today, MAX_TRACKED_DAYS);
    let mut report = ScanReport::default();

    let licenses = license_repo::expiry_candidates(horizon, company_id).await?;
    report.licenses_checked = licenses.len();
    scan_candidates(TrackedKind::License, &licenses, today, &mut report).await;

    let documents = document_repo::expiry_candidates(horizon, company_id).await?;
    report.documents_checked = documents.len();
    scan_candidates(TrackedKind::CompanyDocument, &documents, today, &mut report).await;

    log::info!(
        "Expiry scan for {} ({}): {} licenses, {} documents checked, {} notifications, {} skipped, {} failures",
        today,
        company_id.map_or_else(|| "all companies".to_string(), |id| id.to_string()),
        report.licenses_checked,
        report.documents_checked,
        report.notifications_created,
        report.skipped,
        report.failures
    );

    Ok(report)
}

fn to_upcoming(kind: TrackedKind, candidate: ExpiryCandidate, today: NaiveDate) -> UpcomingExpiry {
    let days_left = days_until(candidate.expiry_date, today);
    UpcomingExpiry {
        kind,
        id: candidate.id,
        label: candidate.label,
        expiry_date: candidate.expiry_date,
        days_left,
        stage: ExpiryStage::for_days_left(days_left),
    }
}

/// Licenses and documents of a company expiring within `days`, soonest first
pub async fn upcoming(
    company_id: Uuid,
    days: i64,
    today: NaiveDate,
) -> Result<Vec<UpcomingExpiry>, AppError> {
    let horizon = horizon(today, days);

    let mut items: Vec<UpcomingExpiry> = license_repo::expiring_before(company_id, horizon)
        .await?
        .into_iter()
        .map(|c| to_upcoming(TrackedKind::License, c, today))
        .collect();

    items.extend(
        document_repo::expiring_before(company_id, horizon)
            .await?
            .into_iter()
            .map(|c| to_upcoming(TrackedKind::CompanyDocument, c, today)),
    );

    items.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then_with(|| a.label.cmp(&b.label)));

    Ok(items)
}

/// Background loop started by `main`
pub async fn run_expiry_scanner(interval_seconds: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        if let Err(e) = scan(crate::database::models::today(), None).await {
            log::error!("Expiry scan failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn candidate(expiry_date: NaiveDate, flags: ExpiryFlags) -> ExpiryCandidate {
        ExpiryCandidate {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            label: "Ana Silva: Forklift #F-12".to_string(),
            expiry_date,
            flags,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_nothing_due_beyond_window() {
        let today = date(2025, 1, 1);
        let c = candidate(today + Duration::days(200), ExpiryFlags::default());
        assert_eq!(plan_alert(TrackedKind::License, &c, today), None);
    }

    #[test]
    fn test_late_discovery_fires_tightest_stage_once() {
        let today = date(2025, 1, 1);
        let c = candidate(today + Duration::days(20), ExpiryFlags::default());

        let alert = plan_alert(TrackedKind::License, &c, today).unwrap();
        assert_eq!(alert.stage, ExpiryStage::Days30);
        assert_eq!(alert.days_left, 20);
        assert!(alert.flags.notified_180_days);
        assert!(alert.flags.notified_90_days);
        assert!(alert.flags.notified_30_days);
        assert!(!alert.flags.notified_7_days);
        assert_eq!(alert.notification.kind, NotificationKind::ExpiryWarning);
        assert_eq!(alert.notification.user_id, None);
        assert_eq!(alert.notification.entity_id, Some(c.id));

        let rerun = candidate(c.expiry_date, alert.flags);
        assert_eq!(plan_alert(TrackedKind::License, &rerun, today), None);
    }

    #[test]
    fn test_expired_document_alert() {
        let today = date(2025, 3, 10);
        let c = candidate(date(2025, 3, 9), ExpiryFlags::default());

        let alert = plan_alert(TrackedKind::CompanyDocument, &c, today).unwrap();
        assert_eq!(alert.stage, ExpiryStage::Expired);
        assert_eq!(alert.notification.kind, NotificationKind::Expired);
        assert_eq!(
            alert.notification.entity_type.as_deref(),
            Some("company_document")
        );
        assert!(alert.flags.is_complete());
        assert!(alert.notification.message.contains("expired on 2025-03-09"));
    }

    #[test]
    fn test_upcoming_row_carries_stage() {
        let today = date(2025, 1, 1);
        let row = to_upcoming(
            TrackedKind::License,
            candidate(today + Duration::days(5), ExpiryFlags::default()),
            today,
        );
        assert_eq!(row.days_left, 5);
        assert_eq!(row.stage, Some(ExpiryStage::Days7));
    }
}

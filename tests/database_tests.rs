use actix_web::{http::StatusCode, test::{self}};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serial_test::serial;

use workdocs::{
    AppError,
    database::{
        get_pool,
        models::{
            ApprovalEntity, ApprovalStatus, ExpiryFlags, LicenseFilter, MAX_TRACKED_DAYS,
            TrackedKind, horizon, today,
        },
        repositories::{
            approval as approval_repo, license as license_repo, worker as worker_repo,
        },
        transaction::DatabaseTransaction,
    },
    services::{
        approval::{self, ChangeOutcome, ChangeProposal},
        auth::Claims,
        expiry::{self, AlertOutcome},
    },
};

mod common;

use common::db::{Tenant, request_info, with_database};

async fn notifications_for(entity_id: uuid::Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE entity_id = $1")
        .bind(entity_id)
        .fetch_one(get_pool())
        .await
        .unwrap()
}

#[test]
#[serial]
fn test_approved_update_is_applied() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;

        let mut input = tenant.worker_input();
        input.position = Some("Crane operator".to_string());
        let proposal = ChangeProposal::update(ApprovalEntity::Worker, worker.id, &input).unwrap();

        let outcome = approval::submit_or_apply(&tenant.staff, proposal, &request_info())
            .await
            .unwrap();
        let ChangeOutcome::Queued(request) = outcome else {
            panic!("staff change should wait for review");
        };
        assert_eq!(request.status, ApprovalStatus::Pending);

        let untouched = worker_repo::find_by_id(tenant.company.id, worker.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.position.as_deref(), Some("Operator"));

        let approved = approval::approve(&tenant.admin, request.id, None, &request_info())
            .await
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(tenant.admin_user.id));

        let updated = worker_repo::find_by_id(tenant.company.id, worker.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.position.as_deref(), Some("Crane operator"));
        assert_eq!(updated.first_name, input.first_name);
    });
}

#[test]
#[serial]
fn test_approved_delete_cascades_to_licenses() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let license = tenant.license(worker.id, today() + Duration::days(60)).await;

        let proposal = ChangeProposal::delete(
            ApprovalEntity::Worker,
            worker.id,
            Some("Left the company".to_string()),
        );
        let ChangeOutcome::Queued(request) =
            approval::submit_or_apply(&tenant.staff, proposal, &request_info())
                .await
                .unwrap()
        else {
            panic!("staff delete should wait for review");
        };

        approval::approve(&tenant.admin, request.id, None, &request_info())
            .await
            .unwrap();

        assert!(worker_repo::find_by_id(tenant.company.id, worker.id)
            .await
            .unwrap()
            .is_none());
        assert!(license_repo::find_by_id(tenant.company.id, license.id)
            .await
            .unwrap()
            .is_none());
    });
}

#[test]
#[serial]
fn test_stale_request_conflicts_and_stays_pending() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;

        let mut proposed = tenant.worker_input();
        proposed.position = Some("Supervisor".to_string());
        let ChangeOutcome::Queued(request) = approval::submit_or_apply(
            &tenant.staff,
            ChangeProposal::update(ApprovalEntity::Worker, worker.id, &proposed).unwrap(),
            &request_info(),
        )
        .await
        .unwrap() else {
            panic!("staff change should wait for review");
        };

        // The admin bypasses review and edits the worker first
        let mut direct = tenant.worker_input();
        direct.position = Some("Foreman".to_string());
        let outcome = approval::submit_or_apply(
            &tenant.admin,
            ChangeProposal::update(ApprovalEntity::Worker, worker.id, &direct).unwrap(),
            &request_info(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, ChangeOutcome::Applied(_)));

        let result = approval::approve(&tenant.admin, request.id, None, &request_info()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let still = approval_repo::find_by_id(tenant.company.id, request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(still.status, ApprovalStatus::Pending);

        let current = worker_repo::find_by_id(tenant.company.id, worker.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.position.as_deref(), Some("Foreman"));
    });
}

#[test]
#[serial]
fn test_second_pending_request_conflicts() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let input = tenant.worker_input();

        let first = approval::submit_or_apply(
            &tenant.staff,
            ChangeProposal::update(ApprovalEntity::Worker, worker.id, &input).unwrap(),
            &request_info(),
        )
        .await;
        assert!(matches!(first, Ok(ChangeOutcome::Queued(_))));

        let second = approval::submit_or_apply(
            &tenant.staff,
            ChangeProposal::delete(ApprovalEntity::Worker, worker.id, None),
            &request_info(),
        )
        .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    });
}

#[test]
#[serial]
fn test_expiry_change_resets_flags() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let license = tenant.license(worker.id, today() + Duration::days(20)).await;

        let report = expiry::scan(today(), Some(tenant.company.id)).await.unwrap();
        assert_eq!(report.notifications_created, 1);

        let alerted = license_repo::find_by_id(tenant.company.id, license.id)
            .await
            .unwrap()
            .unwrap();
        assert!(alerted.flags.notified_30_days);
        assert!(alerted.flags.notified_180_days);

        // Same date, new number: flags survive
        let same_date = tenant.renew(&license, license.expiry_date).await;
        assert_eq!(same_date.flags, alerted.flags);

        let renewed = tenant.renew(&license, today() + Duration::days(365)).await;
        assert_eq!(renewed.flags, ExpiryFlags::default());
    });
}

#[test]
#[serial]
fn test_second_scan_on_same_day_creates_nothing() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        tenant.license(worker.id, today() + Duration::days(5)).await;
        tenant.document(today() + Duration::days(100)).await;

        let first = expiry::scan(today(), Some(tenant.company.id)).await.unwrap();
        assert_eq!(first.licenses_checked, 1);
        assert_eq!(first.documents_checked, 1);
        assert_eq!(first.notifications_created, 2);
        assert_eq!(first.failures, 0);

        let second = expiry::scan(today(), Some(tenant.company.id)).await.unwrap();
        assert_eq!(second.notifications_created, 0);
        assert_eq!(second.failures, 0);
    });
}

#[test]
#[serial]
fn test_renewal_between_load_and_alert_writes_nothing() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let license = tenant.license(worker.id, today() + Duration::days(5)).await;

        let candidates = license_repo::expiry_candidates(
            horizon(today(), MAX_TRACKED_DAYS),
            Some(tenant.company.id),
        )
        .await
        .unwrap();
        let candidate = candidates
            .into_iter()
            .find(|c| c.id == license.id)
            .unwrap();

        // Renewal lands after the scanner loaded the row
        tenant.renew(&license, today() + Duration::days(365)).await;

        let outcome = expiry::process_candidate(TrackedKind::License, &candidate, today())
            .await
            .unwrap();
        assert_eq!(outcome, AlertOutcome::Renewed);

        let stored = license_repo::find_by_id(tenant.company.id, license.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.flags, ExpiryFlags::default());
        assert_eq!(notifications_for(license.id).await, 0);
    });
}

#[test]
#[serial]
fn test_manual_scan_stays_inside_the_company() {
    with_database(|| async {
        let ours = Tenant::create().await;
        let theirs = Tenant::create().await;
        let our_license = ours.license(ours.hire().await.id, today() + Duration::days(5)).await;
        let their_license = theirs
            .license(theirs.hire().await.id, today() + Duration::days(5))
            .await;

        let report = expiry::scan(today(), Some(ours.company.id)).await.unwrap();
        assert_eq!(report.licenses_checked, 1);
        assert_eq!(report.notifications_created, 1);

        assert_eq!(notifications_for(our_license.id).await, 1);
        assert_eq!(notifications_for(their_license.id).await, 0);

        let untouched = license_repo::find_by_id(theirs.company.id, their_license.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.flags, ExpiryFlags::default());
    });
}

#[test]
#[serial]
fn test_worker_delete_cascades_to_licenses() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let license = tenant.license(worker.id, today() + Duration::days(90)).await;
        let company_id = tenant.company.id;
        let worker_id = worker.id;

        let deleted = DatabaseTransaction::run(|tx| {
            Box::pin(async move { Ok(worker_repo::delete_worker(tx, company_id, worker_id).await?) })
        })
        .await
        .unwrap();
        assert!(deleted);

        assert!(license_repo::find_by_id(company_id, license.id)
            .await
            .unwrap()
            .is_none());
    });
}

#[test]
#[serial]
fn test_huge_expiry_window() {
    with_database(|| async {
        let tenant = Tenant::create().await;
        let worker = tenant.hire().await;
        let license = tenant.license(worker.id, today() + Duration::days(400)).await;

        // Repository saturates instead of overflowing the date
        let filter = LicenseFilter {
            expiring_within_days: Some(i64::MAX),
            ..LicenseFilter::default()
        };
        let rows = license_repo::list_licenses(tenant.company.id, &filter, today(), 50, 0)
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|l| l.id).collect::<Vec<_>>(), vec![license.id]);

        // The HTTP layer rejects it outright
        let claims = Claims {
            sub: tenant.admin_user.id,
            email: tenant.admin_user.email.clone(),
            company_id: Some(tenant.company.id),
            role: None,
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = common::token_for(&claims, &workdocs::config::config().jwt_secret);
        let app = test::init_service(common::app()).await;

        for window in ["9223372036854775807", "-1"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/v1/licenses?expiringWithinDays={}", window))
                .insert_header(common::bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "window {}", window);

            let req = test::TestRequest::get()
                .uri(&format!("/api/v1/documents?expiringWithinDays={}", window))
                .insert_header(common::bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "window {}", window);
        }
    });
}

//! PostgreSQL fixtures. Tests using them are skipped unless `TEST_DATABASE_URL` is set.

use std::{collections::HashSet, future::Future, sync::{Arc, LazyLock}};

use chrono::NaiveDate;
use fake::{
    Fake,
    faker::{company::en::CompanyName, name::en::{FirstName, LastName, Name}},
};
use tokio::{runtime::Runtime, sync::OnceCell};
use uuid::Uuid;

use workdocs::{
    config::{self, Config},
    database::{
        self,
        models::{
            Company, CompanyDocument, CompanyDocumentInput, CompanyInfo, CompanyInput, CompanyRole,
            License, LicenseInput, PermissionKey, User, Worker, WorkerInput,
        },
        repositories::{
            company as company_repo, document as document_repo, license as license_repo,
            user as user_repo, worker as worker_repo,
        },
        transaction::DatabaseTransaction,
    },
    middleware::RequestInfo,
    services::user_context::UserContext,
};

pub const DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";

// The global pool's connections belong to the runtime that opened them
static RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("test runtime should build")
});

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Run `test` against a migrated database, or skip it when none is configured
pub fn with_database<F, Fut>(test: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{} not set, skipping database test", DATABASE_URL_VAR);
        return;
    };

    RUNTIME.block_on(async move {
        MIGRATED
            .get_or_init(|| async {
                let _ = env_logger::builder().is_test(true).try_init();
                config::init(Config {
                    database_url: url.clone(),
                    ..Config::test_config()
                });
                database::init_database(&url)
                    .await
                    .expect("test database should accept migrations");
            })
            .await;

        test().await;
    });
}

pub fn request_info() -> RequestInfo {
    RequestInfo {
        user_agent: "workdocs-tests".to_string(),
        ip_address: "127.0.0.1".to_string(),
        method: "PUT".to_string(),
        path: "/api/v1/test".to_string(),
        correlation_id: None,
    }
}

fn context(user: &User, company: &Company, role: CompanyRole, keys: &[&str]) -> UserContext {
    UserContext {
        user: user.clone(),
        company: Some(CompanyInfo {
            id: company.id,
            name: company.name.clone(),
            registration_number: company.registration_number.clone(),
            role,
            is_primary: true,
        }),
        permissions: Arc::new(keys.iter().map(|k| k.to_string()).collect::<HashSet<_>>()),
    }
}

/// A fresh company with an admin and a staff member who may propose changes
/// but not bypass review
pub struct Tenant {
    pub company: Company,
    pub admin_user: User,
    pub admin: UserContext,
    pub staff: UserContext,
}

impl Tenant {
    pub async fn create() -> Tenant {
        let tag = Uuid::new_v4().simple().to_string();

        let (company, admin_user, staff_user) = DatabaseTransaction::run(|tx| {
            Box::pin(async move {
                let company = company_repo::create_company(
                    tx,
                    &CompanyInput {
                        name: CompanyName().fake(),
                        registration_number: None,
                        address: None,
                        phone: None,
                        email: None,
                    },
                )
                .await?;

                let admin_name: String = Name().fake();
                let staff_name: String = Name().fake();
                let admin = user_repo::create_user(
                    tx,
                    &format!("admin-{}@example.com", tag),
                    "unused-hash",
                    &admin_name,
                )
                .await?;
                let staff = user_repo::create_user(
                    tx,
                    &format!("staff-{}@example.com", tag),
                    "unused-hash",
                    &staff_name,
                )
                .await?;

                company_repo::add_member(tx, company.id, admin.id, CompanyRole::Admin, true).await?;
                company_repo::add_member(tx, company.id, staff.id, CompanyRole::Staff, true).await?;

                Ok((company, admin, staff))
            })
        })
        .await
        .expect("tenant fixtures should insert");

        let admin = context(&admin_user, &company, CompanyRole::Admin, &[]);
        let staff = context(
            &staff_user,
            &company,
            CompanyRole::Staff,
            &[
                PermissionKey::WORKERS_VIEW,
                PermissionKey::WORKERS_UPDATE,
                PermissionKey::WORKERS_DELETE,
                PermissionKey::LICENSES_UPDATE,
            ],
        );

        Tenant {
            company,
            admin_user,
            admin,
            staff,
        }
    }

    pub fn worker_input(&self) -> WorkerInput {
        WorkerInput {
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            email: None,
            phone: None,
            national_id: None,
            position: Some("Operator".to_string()),
            status: None,
            hire_date: None,
        }
    }

    pub async fn hire(&self) -> Worker {
        let company_id = self.company.id;
        let input = self.worker_input();

        DatabaseTransaction::run(|tx| {
            Box::pin(async move { Ok(worker_repo::create_worker(tx, company_id, &input).await?) })
        })
        .await
        .expect("worker should insert")
    }

    pub fn license_input(worker_id: Uuid, expiry_date: NaiveDate) -> LicenseInput {
        LicenseInput {
            worker_id,
            license_type: "Forklift".to_string(),
            license_number: format!("F-{}", &Uuid::new_v4().simple().to_string()[..8]),
            issuing_authority: None,
            issue_date: None,
            expiry_date,
            notes: None,
        }
    }

    pub async fn license(&self, worker_id: Uuid, expiry_date: NaiveDate) -> License {
        let company_id = self.company.id;
        let input = Self::license_input(worker_id, expiry_date);

        DatabaseTransaction::run(|tx| {
            Box::pin(async move { Ok(license_repo::create_license(tx, company_id, &input).await?) })
        })
        .await
        .expect("license should insert")
    }

    pub async fn document(&self, expiry_date: NaiveDate) -> CompanyDocument {
        let company_id = self.company.id;
        let input = CompanyDocumentInput {
            document_type: "insurance".to_string(),
            title: "Liability insurance".to_string(),
            document_number: None,
            issue_date: None,
            expiry_date: Some(expiry_date),
            file_url: None,
            notes: None,
        };

        DatabaseTransaction::run(|tx| {
            Box::pin(async move { Ok(document_repo::create_document(tx, company_id, &input).await?) })
        })
        .await
        .expect("document should insert")
    }

    /// Write a new expiry date directly, as a renewal through the API would
    pub async fn renew(&self, license: &License, expiry_date: NaiveDate) -> License {
        let company_id = self.company.id;
        let license_id = license.id;
        let input = Self::license_input(license.worker_id, expiry_date);

        DatabaseTransaction::run(|tx| {
            Box::pin(async move {
                Ok(license_repo::update_license(tx, company_id, license_id, &input).await?)
            })
        })
        .await
        .expect("license update should succeed")
        .expect("license should exist")
    }
}

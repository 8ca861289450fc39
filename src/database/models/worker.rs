use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum WorkerStatus {
        #[default]
        Active => "active",
        Inactive => "inactive",
        Terminated => "terminated",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: Uuid,
    pub company_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub position: Option<String>,
    pub status: WorkerStatus,
    pub hire_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub position: Option<String>,
    pub status: Option<WorkerStatus>,
    pub hire_date: Option<NaiveDate>,
}

impl WorkerInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("First and last name are required".to_string());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err("Worker email is not a valid address".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerFilter {
    pub status: Option<WorkerStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> WorkerInput {
        WorkerInput {
            first_name: "Maria".into(),
            last_name: "Lopez".into(),
            email: Some("maria@example.com".into()),
            phone: None,
            national_id: Some("X123".into()),
            position: Some("Electrician".into()),
            status: None,
            hire_date: None,
        }
    }

    #[test]
    fn test_validate_worker_input() {
        assert!(input().validate().is_ok());

        let mut blank = input();
        blank.last_name = " ".into();
        assert!(blank.validate().is_err());

        let mut bad_email = input();
        bad_email.email = Some("maria".into());
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_worker_input_camel_case() {
        let parsed: WorkerInput = serde_json::from_value(serde_json::json!({
            "firstName": "Ana",
            "lastName": "Silva",
            "status": "inactive",
            "hireDate": "2024-03-01"
        }))
        .unwrap();
        assert_eq!(parsed.status, Some(WorkerStatus::Inactive));
        assert_eq!(parsed.hire_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}

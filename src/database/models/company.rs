use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum CompanyRole {
        Admin => "admin",
        Manager => "manager",
        #[default]
        Staff => "staff",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: CompanyRole,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A company as seen by one of its members.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub id: Uuid,
    pub name: String,
    pub registration_number: Option<String>,
    pub role: CompanyRole,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMemberInfo {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: CompanyRole,
    pub is_primary: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: String,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CompanyInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Company name is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberInput {
    pub email: String,
    pub role: Option<CompanyRole>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRoleInput {
    pub role: CompanyRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_role_strings() {
        assert_eq!(CompanyRole::Admin.to_string(), "admin");
        assert_eq!("MANAGER".parse::<CompanyRole>(), Ok(CompanyRole::Manager));
        assert!("owner".parse::<CompanyRole>().is_err());
        assert_eq!(CompanyRole::default(), CompanyRole::Staff);
    }

    #[test]
    fn test_company_role_serde() {
        let json = serde_json::to_string(&CompanyRole::Staff).unwrap();
        assert_eq!(json, "\"staff\"");
        let role: CompanyRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, CompanyRole::Admin);
    }
}

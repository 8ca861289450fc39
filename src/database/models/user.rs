use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::company::CompanyInfo;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl CreateUserInput {
    pub const MIN_PASSWORD_LENGTH: usize = 8;

    pub fn validate(&self) -> Result<(), String> {
        if !self.email.contains('@') || self.email.trim().len() < 3 {
            return Err("A valid email address is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if self.password.len() < Self::MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters",
                Self::MIN_PASSWORD_LENGTH
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchCompanyInput {
    pub company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub company: Option<CompanyInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str, password: &str, name: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_good_input() {
        assert!(input("a@b.co", "password123", "Ana").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_password() {
        assert!(input("a@b.co", "short", "Ana").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_email_and_blank_name() {
        assert!(input("not-an-email", "password123", "Ana").validate().is_err());
        assert!(input("a@b.co", "password123", "   ").validate().is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            password_hash: "secret".into(),
            name: "Ana".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
    }
}

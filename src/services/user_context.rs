use actix_web::{Error as ActixError, FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::database::{
    models::{CompanyInfo, CompanyRole, User},
    repositories::{company as company_repo, user as user_repo},
};
use crate::error::AppError;
use crate::services::{
    auth::{Claims, claims_from_request},
    permissions,
};

/// The authenticated caller, their selected company and what they may do there
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub user: User,
    pub company: Option<CompanyInfo>,
    #[serde(skip)]
    pub permissions: Arc<HashSet<String>>,
}

impl UserContext {
    pub async fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        let user = user_repo::find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        let company = match claims.company_id {
            Some(company_id) => company_repo::find_company_info(user.id, company_id).await?,
            None => None,
        };

        let permissions = match company.as_ref() {
            Some(company) => permissions::keys_for(user.id, company.id).await?,
            None => Arc::new(HashSet::new()),
        };

        Ok(UserContext {
            user,
            company,
            permissions,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn company_id(&self) -> Option<Uuid> {
        self.company.as_ref().map(|c| c.id)
    }

    pub fn role(&self) -> Option<CompanyRole> {
        self.company.as_ref().map(|c| c.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(CompanyRole::Admin)
    }

    /// Company admins hold every key implicitly
    pub fn has_permission(&self, key: &str) -> bool {
        self.company.is_some() && (self.is_admin() || self.permissions.contains(key))
    }

    pub fn requires_company(&self) -> Result<&CompanyInfo, AppError> {
        self.company
            .as_ref()
            .ok_or_else(|| AppError::Forbidden("No company selected".to_string()))
    }

    pub fn strict_company_id(&self) -> Result<Uuid, AppError> {
        self.requires_company().map(|c| c.id)
    }

    pub fn requires_permission(&self, key: &str) -> Result<(), AppError> {
        self.requires_company()?;
        if self.has_permission(key) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!("Missing permission '{}'", key)))
        }
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        self.requires_company()?;
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("Company admin role required".to_string()))
        }
    }

    /// Keys the caller effectively holds, sorted
    pub fn effective_permissions(&self) -> Vec<String> {
        use crate::database::models::PermissionKey;

        if self.company.is_none() {
            return Vec::new();
        }
        let mut keys: Vec<String> = if self.is_admin() {
            PermissionKey::ALL.iter().map(|k| k.to_string()).collect()
        } else {
            self.permissions.iter().cloned().collect()
        };
        keys.sort();
        keys
    }
}

impl FromRequest for UserContext {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = claims_from_request(req);

        Box::pin(async move {
            let claims = claims?;
            let context = UserContext::from_claims(&claims).await?;
            Ok(context)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context(role: Option<CompanyRole>, keys: &[&str]) -> UserContext {
        UserContext {
            user: User {
                id: Uuid::new_v4(),
                email: "ana@example.com".to_string(),
                password_hash: String::new(),
                name: "Ana".to_string(),
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            company: role.map(|role| CompanyInfo {
                id: Uuid::new_v4(),
                name: "Acme".to_string(),
                registration_number: None,
                role,
                is_primary: true,
            }),
            permissions: Arc::new(keys.iter().map(|k| k.to_string()).collect()),
        }
    }

    #[test]
    fn test_admin_has_every_permission() {
        let ctx = context(Some(CompanyRole::Admin), &[]);
        assert!(ctx.has_permission("workers.delete"));
        assert!(ctx.requires_admin().is_ok());
        assert_eq!(ctx.effective_permissions().len(), crate::database::models::PermissionKey::ALL.len());
    }

    #[test]
    fn test_staff_needs_explicit_grant() {
        let ctx = context(Some(CompanyRole::Staff), &["workers.view"]);
        assert!(ctx.has_permission("workers.view"));
        assert!(!ctx.has_permission("workers.delete"));
        assert!(matches!(
            ctx.requires_permission("workers.delete"),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(ctx.requires_admin().is_err());
    }

    #[test]
    fn test_no_company_is_forbidden() {
        let ctx = context(None, &["workers.view"]);
        assert!(!ctx.has_permission("workers.view"));
        assert!(matches!(ctx.strict_company_id(), Err(AppError::Forbidden(_))));
        assert!(ctx.effective_permissions().is_empty());
    }
}

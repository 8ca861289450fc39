use actix_web::{Error as ActixError, FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use futures_util::future::{Ready, ready};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::config;
use crate::database::{
    models::{
        Action, AuthResponse, ChangePasswordInput, CompanyInfo, CompanyRole, CreateUserInput,
        LoginInput, User,
    },
    repositories::{company as company_repo, user as user_repo},
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::middleware::request_info::RequestInfo;
use crate::services::activity_logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub company_id: Option<Uuid>,
    pub role: Option<CompanyRole>,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(CompanyRole::Admin)
    }
}

/// Decode and validate a bearer token
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config().jwt_secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Rejected token: {}", e);
        AppError::Unauthorized
    })
}

pub(crate) fn claims_from_request(req: &HttpRequest) -> Result<Claims, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    verify_token(token.trim())
}

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            claims_from_request(req)
                .map_err(|_| ErrorUnauthorized("Missing or invalid authorization header")),
        )
    }
}

pub fn generate_token(
    user: &User,
    company_id: Option<Uuid>,
    role: Option<CompanyRole>,
) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(config().jwt_expiration_days))
        .ok_or_else(|| AppError::internal_server_error_message("Invalid token expiration"))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        company_id,
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config().jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::internal_server_error_message(format!("Token encoding failed: {}", e)))
}

fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal_server_error_message(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::internal_server_error_message(format!("Password check failed: {}", e)))
}

/// Primary membership first, otherwise the first one alphabetically
fn pick_company(companies: Vec<CompanyInfo>) -> Option<CompanyInfo> {
    let primary = companies.iter().position(|c| c.is_primary);
    let mut companies = companies;
    match primary {
        Some(index) => Some(companies.swap_remove(index)),
        None => companies.into_iter().next(),
    }
}

pub async fn register(input: CreateUserInput) -> Result<AuthResponse, AppError> {
    input.validate().map_err(AppError::ValidationError)?;

    if user_repo::email_exists(&input.email).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(&input.password)?;

    let user = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let user =
                user_repo::create_user(tx, &input.email, &password_hash, input.name.trim()).await?;
            Ok(user)
        })
    })
    .await?;

    log::info!("Registered user {}", user.id);

    let token = generate_token(&user, None, None)?;

    Ok(AuthResponse {
        token,
        user: user.into(),
        company: None,
    })
}

pub async fn login(input: LoginInput, req_info: &RequestInfo) -> Result<AuthResponse, AppError> {
    let user = user_repo::find_by_email(&input.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".to_string()))?;

    if !verify_password(&input.password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid email or password".to_string()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let companies = company_repo::get_companies_for_user(user.id).await?;
    let company = pick_company(companies);

    let token = generate_token(&user, company.as_ref().map(|c| c.id), company.as_ref().map(|c| c.role))?;

    if let Some(company) = company.as_ref() {
        let company_id = company.id;
        let user_id = user.id;
        let description = format!("{} logged in", user.email);
        let req_info = req_info.clone();
        DatabaseTransaction::run(|tx| {
            Box::pin(async move {
                activity_logger::log_auth_activity(
                    tx,
                    company_id,
                    user_id,
                    Action::LOGIN,
                    description,
                    &req_info,
                )
                .await?;
                Ok(())
            })
        })
        .await?;
    }

    Ok(AuthResponse {
        token,
        user: user.into(),
        company,
    })
}

pub async fn switch_company(
    user: &User,
    company_id: Uuid,
    req_info: &RequestInfo,
) -> Result<AuthResponse, AppError> {
    let company = company_repo::find_company_info(user.id, company_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("User does not belong to this company".to_string()))?;

    let token = generate_token(user, Some(company.id), Some(company.role))?;

    let user_id = user.id;
    let description = format!("{} switched to {}", user.email, company.name);
    let req_info = req_info.clone();
    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            activity_logger::log_auth_activity(
                tx,
                company_id,
                user_id,
                Action::SWITCH_COMPANY,
                description,
                &req_info,
            )
            .await?;
            Ok(())
        })
    })
    .await?;

    Ok(AuthResponse {
        token,
        user: user.clone().into(),
        company: Some(company),
    })
}

pub async fn change_password(
    user: &User,
    company_id: Option<Uuid>,
    input: ChangePasswordInput,
    req_info: &RequestInfo,
) -> Result<(), AppError> {
    if input.new_password.len() < CreateUserInput::MIN_PASSWORD_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            CreateUserInput::MIN_PASSWORD_LENGTH
        )));
    }

    if !verify_password(&input.current_password, &user.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&input.new_password)?;
    let user_id = user.id;
    let description = format!("{} changed their password", user.email);
    let req_info = req_info.clone();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            user_repo::update_password(tx, user_id, &password_hash).await?;

            if let Some(company_id) = company_id {
                activity_logger::log_auth_activity(
                    tx,
                    company_id,
                    user_id,
                    Action::PASSWORD_CHANGED,
                    description,
                    &req_info,
                )
                .await?;
            }

            Ok(())
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, Config};

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            name: "Ana".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn company(name: &str, is_primary: bool) -> CompanyInfo {
        CompanyInfo {
            id: Uuid::new_v4(),
            name: name.to_string(),
            registration_number: None,
            role: CompanyRole::Staff,
            is_primary,
        }
    }

    #[test]
    fn test_token_round_trip() {
        config::init(Config::test_config());
        let user = user();
        let company_id = Uuid::new_v4();

        let token = generate_token(&user, Some(company_id), Some(CompanyRole::Admin)).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.company_id, Some(company_id));
        assert!(claims.is_admin());
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        config::init(Config::test_config());
        assert!(matches!(verify_token("not-a-token"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_pick_company_prefers_primary() {
        let picked = pick_company(vec![company("Acme", false), company("Zeta", true)]).unwrap();
        assert_eq!(picked.name, "Zeta");

        let picked = pick_company(vec![company("Acme", false), company("Beta", false)]).unwrap();
        assert_eq!(picked.name, "Acme");

        assert!(pick_company(Vec::new()).is_none());
    }
}

use actix_web::{HttpResponse, web::Query};
use serde::Deserialize;

use crate::{
    database::models::{MAX_TRACKED_DAYS, today},
    error::AppError,
    handlers::shared::ApiResponse,
    services::{expiry, user_context::UserContext},
};

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

impl UpcomingQuery {
    pub const DEFAULT_DAYS: i64 = 30;

    pub fn days(&self) -> Result<i64, AppError> {
        match self.days {
            None => Ok(Self::DEFAULT_DAYS),
            Some(days) if days < 0 => Err(AppError::BadRequest(
                "days must not be negative".to_string(),
            )),
            Some(days) => Ok(days.min(MAX_TRACKED_DAYS)),
        }
    }
}

/// Runs the scanner now for the caller's company
pub async fn run_scan(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_admin()?;

    log::info!("Expiry scan for company {} triggered by {}", company_id, ctx.user_id());
    let report = expiry::scan(today(), Some(company_id)).await?;

    Ok(ApiResponse::ok(report))
}

pub async fn upcoming(
    query: Query<UpcomingQuery>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    let days = query.days()?;

    let items = expiry::upcoming(company_id, days, today()).await?;
    Ok(ApiResponse::ok(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upcoming_days() {
        assert_eq!(UpcomingQuery::default().days().unwrap(), 30);
        assert_eq!(UpcomingQuery { days: Some(7) }.days().unwrap(), 7);
        assert_eq!(UpcomingQuery { days: Some(400) }.days().unwrap(), MAX_TRACKED_DAYS);
        assert!(matches!(
            UpcomingQuery { days: Some(-1) }.days(),
            Err(AppError::BadRequest(_))
        ));
    }
}

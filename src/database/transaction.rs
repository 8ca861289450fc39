use std::{future::Future, pin::Pin};

use sqlx::{Postgres, Transaction};

use crate::{database::get_pool, error::AppError};

/// Body of a unit of work, borrowing the open transaction
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// Commits when the closure returns `Ok`, rolls back on `Err`.
#[derive(Debug)]
pub struct DatabaseTransaction;

impl DatabaseTransaction {
    pub async fn run<T, F>(work: F) -> Result<T, AppError>
    where
        F: for<'a> FnOnce(&'a mut Transaction<'static, Postgres>) -> TxFuture<'a, T>,
        T: Send,
    {
        let mut tx = get_pool().begin().await?;
        let outcome = work(&mut tx).await;
        Self::settle(tx, outcome).await
    }

    async fn settle<T>(
        tx: Transaction<'static, Postgres>,
        outcome: Result<T, AppError>,
    ) -> Result<T, AppError> {
        let err = match outcome {
            Ok(value) => {
                tx.commit().await?;
                return Ok(value);
            }
            Err(err) => err,
        };

        match tx.rollback().await {
            Ok(()) => log::warn!("Rolled back transaction: {}", err),
            Err(rollback_err) => {
                log::error!("Rollback failed ({}) after: {}", rollback_err, err)
            }
        }
        Err(err)
    }
}

//! Marketing mail fan-out: new product announcements and admin campaigns.
//!
//! Every message carries the recipient's own unsubscribe link. Individual
//! send failures are logged and counted, never propagated.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::{RepositoryError, SubscriberRepository, UserRepository};
use crate::models::Product;

use super::email::EmailService;

/// Outcome of a campaign send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignReport {
    pub sent: usize,
    /// Unsubscribed users and users without an email address.
    pub skipped: usize,
    pub failed: usize,
}

/// Announce a new product to every subscriber.
///
/// Intended to run in a spawned task after the product is created.
#[instrument(skip(pool, email, product), fields(product_id = %product.id))]
pub async fn notify_new_product(pool: PgPool, email: EmailService, product: Product) {
    let subscribers = match SubscriberRepository::new(&pool).list_with_tokens().await {
        Ok(subscribers) => subscribers,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load subscribers for product notification");
            return;
        }
    };
    if subscribers.is_empty() {
        tracing::info!("No subscribers to notify");
        return;
    }

    let mut sent = 0usize;
    for subscriber in &subscribers {
        let Some(token) = subscriber.unsubscribe_token.as_deref() else {
            continue;
        };
        match email
            .send_new_product(subscriber.email.as_str(), &product, token)
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::warn!(error = %e, subscriber = %subscriber.email, "Product notification failed");
            }
        }
    }
    tracing::info!(sent, total = subscribers.len(), "Product notifications sent");
}

/// Send a campaign to every user who has not unsubscribed.
///
/// Users without an unsubscribe token get one first.
///
/// # Errors
///
/// Returns `RepositoryError` if the user list or a token cannot be loaded.
#[instrument(skip(pool, email, message))]
pub async fn send_campaign(
    pool: &PgPool,
    email: &EmailService,
    subject: &str,
    message: &str,
) -> Result<CampaignReport, RepositoryError> {
    let users = UserRepository::new(pool);
    let mut report = CampaignReport::default();

    for user in users.list().await? {
        let Some(address) = user.email.as_ref().filter(|_| !user.unsubscribed) else {
            report.skipped += 1;
            continue;
        };
        let token = users.ensure_unsubscribe_token(user.id).await?;
        match email
            .send_campaign(address.as_str(), subject, message, &token)
            .await
        {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "Campaign email failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "Campaign finished"
    );
    Ok(report)
}

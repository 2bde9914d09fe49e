use std::time::Duration;

use anyhow::Context;
use bookshelf_kernel::settings::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create a PostgreSQL connection pool, retrying the first connection with
/// exponential backoff.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let base_delay = Duration::from_secs(settings.retry_delay_secs);
    let mut attempt = 0;

    loop {
        match try_connect(settings).await {
            Ok(pool) => {
                tracing::info!(
                    target: "bookshelf-db",
                    url = %sanitize_connection_url(&settings.url),
                    max = settings.max_connections,
                    min = settings.min_connections,
                    "database connection pool created"
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > settings.max_retries {
                    tracing::error!(
                        target: "bookshelf-db",
                        attempts = attempt,
                        kind = categorize(&e),
                        error = %e,
                        "giving up on database connection"
                    );
                    return Err(e).with_context(|| {
                        format!(
                            "failed to connect to database at '{}'",
                            sanitize_connection_url(&settings.url)
                        )
                    });
                }

                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(
                    target: "bookshelf-db",
                    attempt,
                    kind = categorize(&e),
                    error = %e,
                    "database connection failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// `base` doubled for each retry after the first, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

async fn try_connect(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .connect(&settings.url)
        .await
}

/// Mask the password of a connection URL for logging.
pub fn sanitize_connection_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    let credentials = &url[scheme_end + 3..at_pos];
    match credentials.find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..scheme_end + 3],
            &credentials[..colon],
            &url[at_pos..]
        ),
        None => url.to_string(),
    }
}

fn categorize(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Configuration(_) => "configuration",
        sqlx::Error::Database(_) => "database",
        sqlx::Error::Io(_) => "io",
        sqlx::Error::Tls(_) => "tls",
        sqlx::Error::PoolTimedOut => "pool_timeout",
        sqlx::Error::PoolClosed => "pool_closed",
        _ => "other",
    }
}

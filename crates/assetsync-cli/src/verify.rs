//! Asset URL verification for product image lists.

use std::time::Duration;

use assetsync_core::PipelineConfig;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;

/// HEAD-check every URL in every live product's asset list.
///
/// Logs non-200 URLs for cleanup and prints aggregate totals.
pub(crate) async fn run_verify(
    pool: &sqlx::PgPool,
    concurrency: usize,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let products = assetsync_db::list_products(pool).await?;
    let targets: Vec<(i64, String)> = products
        .into_iter()
        .flat_map(|row| {
            let id = row.id;
            row.images.into_iter().map(move |url| (id, url))
        })
        .collect();

    if targets.is_empty() {
        println!("no asset URLs found to verify");
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()?;

    let (ok_count, bad_count) = verify_urls(&client, targets, concurrency).await;
    println!("verified asset URLs: {ok_count} OK, {bad_count} bad");
    Ok(())
}

pub(crate) async fn verify_urls(
    client: &reqwest::Client,
    targets: Vec<(i64, String)>,
    concurrency: usize,
) -> (usize, usize) {
    let checks = stream::iter(targets.into_iter().map(|(product_id, url)| {
        let client = client.clone();
        async move {
            let result = client.head(&url).send().await;
            (product_id, url, result)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut ok_count = 0usize;
    let mut bad_count = 0usize;
    for (product_id, url, result) in checks {
        match result {
            Ok(resp) if resp.status() == StatusCode::OK => {
                ok_count += 1;
            }
            Ok(resp) => {
                bad_count += 1;
                tracing::warn!(
                    product_id,
                    status = resp.status().as_u16(),
                    url = %url,
                    "asset URL verification failed"
                );
            }
            Err(e) => {
                bad_count += 1;
                tracing::warn!(
                    product_id,
                    error = %e,
                    url = %url,
                    "asset URL verification failed"
                );
            }
        }
    }
    (ok_count, bad_count)
}

//! `health` command.

use std::time::Duration;

use anyhow::anyhow;
use cleanslate_api::models::{HealthResponse, ProblemDetails};
use reqwest::{Client, Url};
use uuid::Uuid;

use crate::cli::HealthArgs;
use crate::client::{CliError, CliResult, http_client};

pub(crate) async fn handle_health(args: HealthArgs) -> CliResult<()> {
    let Some(api_url) = args.api_url else {
        println!("OK");
        return Ok(());
    };
    let client = http_client(&Uuid::new_v4().to_string(), Duration::from_secs(args.timeout))?;
    let report = probe(&client, &api_url).await?;
    println!("{report}");
    Ok(())
}

/// Query `GET /health` on a running API.
pub(crate) async fn probe(client: &Client, base: &Url) -> CliResult<String> {
    let url = base
        .join("health")
        .map_err(|err| CliError::validation(format!("invalid API URL {base}: {err}")))?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {url} failed: {err}")))?;
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ProblemDetails>()
            .await
            .ok()
            .and_then(|problem| problem.detail.or(Some(problem.title)))
            .unwrap_or_else(|| status.to_string());
        return Err(CliError::failure(anyhow!("API unhealthy ({status}): {detail}")));
    }
    let body: HealthResponse = response
        .json()
        .await
        .map_err(|err| CliError::failure(anyhow!("unexpected health response: {err}")))?;
    if body.status != "ok" {
        return Err(CliError::failure(anyhow!("API reported status {}", body.status)));
    }
    Ok(format!("OK (build {})", body.build))
}

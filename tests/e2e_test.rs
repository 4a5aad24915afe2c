//! End-to-end tests for the courier binary.
//!
//! Runs the compiled executable against a mock destination with a short
//! backoff configured through the environment.

use std::{path::Path, process::Output};

use anyhow::Result;
use tokio::process::Command;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

async fn run_courier(dir: &Path, input: &Path) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_courier"))
        .arg(input)
        .current_dir(dir)
        .env("COURIER_INITIAL_DELAY_TIME", "0.01")
        .env("COURIER_MAX_DELAY_TIME", "0.05")
        .env("COURIER_EXPONENTIAL_BACKOFF_FACTOR", "3")
        .env("COURIER_RESPONSE_TIMEOUT", "1")
        .env("RUST_LOG", "warn")
        .output()
        .await?;
    Ok(output)
}

#[tokio::test]
async fn delivers_every_row_of_the_input_file() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/hooks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("webhooks.txt");
    std::fs::write(
        &input,
        format!(
            "URL, ORDER ID, NAME, EVENT\n{uri}/hooks, 1, Alice, order.created\n\
             {uri}/hooks, 2, Bob, order.shipped\n",
            uri = server.uri()
        ),
    )?;

    let output = run_courier(dir.path(), &input).await?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    server.verify().await;
    Ok(())
}

#[tokio::test]
async fn failing_destination_is_retried_then_capped() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("webhooks.txt");
    std::fs::write(
        &input,
        format!(
            "URL,ORDER ID,NAME,EVENT\n{uri}/a,1,Alice,created\n{uri}/a,2,Bob,created\n",
            uri = server.uri()
        ),
    )?;
    std::fs::write(dir.path().join("courier.toml"), "max_url_failure = 1\n")?;

    let output = run_courier(dir.path(), &input).await?;

    assert!(output.status.success());
    // Both chains interleave until the first is abandoned after its third
    // attempt; the second chain's third attempt is then skipped.
    let received = server.received_requests().await.map_or(0, |requests| requests.len());
    assert_eq!(received, 5);
    Ok(())
}

#[tokio::test]
async fn missing_input_file_exits_with_error() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let output = run_courier(dir.path(), &dir.path().join("absent.txt")).await?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.txt"));
    Ok(())
}

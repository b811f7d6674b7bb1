//! Mock server helpers for the GitHub releases API
//!
//! Release JSON is served under `/repos/{owner}/{repo}/releases/...` and
//! assets under `/download/{name}` on the same server.

use serde_json::json;
use sha2::{Digest, Sha256};
use tether_core::RuntimeConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Runtime configuration pointing every request at `server`
pub fn config_for(server: &MockServer) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.github.api_url = server.uri();
    config.github.repo_owner = TEST_OWNER.to_string();
    config.github.repo_name = TEST_REPO.to_string();
    config.github.asset_suffix = Some(TEST_SUFFIX.to_string());
    config.network.http_timeout_secs = 5;
    config.network.download_timeout_secs = 5;

    // Keep retry delays short
    for policy in std::iter::once(&mut config.retry_policies.default)
        .chain(config.retry_policies.operations.values_mut())
    {
        policy.initial_delay_ms = 10;
        policy.max_delay_ms = 50;
    }
    config
}

fn releases_path(suffix: &str) -> String {
    format!("/repos/{}/{}/releases/{}", TEST_OWNER, TEST_REPO, suffix)
}

/// Release JSON for `tag` with the given asset names served by `server`
pub fn release_json(server: &MockServer, tag: &str, assets: &[(String, usize)]) -> serde_json::Value {
    let assets: Vec<_> = assets
        .iter()
        .map(|(name, size)| {
            json!({
                "name": name,
                "browser_download_url": format!("{}/download/{}", server.uri(), name),
                "size": size,
            })
        })
        .collect();

    json!({
        "tag_name": tag,
        "name": tag,
        "prerelease": false,
        "published_at": "2026-01-01T00:00:00Z",
        "assets": assets,
    })
}

/// Serve `body` as the latest release
pub async fn mock_latest_release(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(releases_path("latest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `body` as the release tagged `tag`
pub async fn mock_tagged_release(server: &MockServer, tag: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(releases_path(&format!("tags/{}", tag))))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Respond to the latest release endpoint with `status`
pub async fn mock_latest_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(releases_path("latest")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve an asset download
pub async fn mock_asset(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Serve an asset that fails `fail_count` times with 503 before succeeding
pub async fn mock_flaky_asset(server: &MockServer, name: &str, fail_count: u64, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    mock_asset(server, name, content).await;
}

/// goreleaser `checksums.txt` content for the given files
pub fn checksums_txt(files: &[(&str, &[u8])]) -> String {
    files
        .iter()
        .map(|(name, content)| format!("{:x}  {}\n", Sha256::digest(content), name))
        .collect()
}

/// Mount a complete release: metadata, archive and checksum manifest
pub async fn mount_release(server: &MockServer, version: &str, archive: &[u8], latest: bool) {
    let tag = format!("v{}", version);
    let archive_name = asset_name(version);
    let manifest_name = checksums_name(version);
    let manifest = checksums_txt(&[(&archive_name, archive)]);

    let body = release_json(
        server,
        &tag,
        &[
            (manifest_name.clone(), manifest.len()),
            (archive_name.clone(), archive.len()),
        ],
    );

    if latest {
        mock_latest_release(server, body.clone()).await;
    }
    mock_tagged_release(server, &tag, body).await;
    mock_asset(server, &archive_name, archive).await;
    mock_asset(server, &manifest_name, manifest.as_bytes()).await;
}

//! Shared setup for commands that talk to the API.

use std::sync::Arc;

use anyhow::{Context, Result};
use bidscope_fetch::{Credential, FetchContext, FetchError, FetchSettings, HttpClient};
use bidscope_store::{Settings, SettingsStore};
use tracing::debug;

/// Loads the settings file.
pub async fn load_settings() -> Result<Settings> {
    let store = SettingsStore::load_default()
        .await
        .context("failed to load settings")?;
    Ok(store.get().await)
}

/// Builds a fetch context over the HTTP client described by `settings`.
pub fn fetch_context(settings: &Settings, fetch: FetchSettings) -> Result<FetchContext> {
    let token = settings
        .effective_token()
        .ok_or(FetchError::MissingCredential)?;
    let credential = Credential::new(token);

    let client = HttpClient::builder(&settings.api_base_url, &credential)
        .credential_header(settings.credential_header.clone())
        .timeout(settings.request_timeout())
        .build()?;
    debug!(base_url = %client.base_url(), ?fetch, "Built API client");

    Ok(FetchContext::builder(Arc::new(client))
        .settings(fetch)
        .build())
}

use std::sync::Arc;

use anyhow::Context;

use sheetbridge::config::AppConfig;
use sheetbridge::http::{cors_layer, router, AppState};
use sheetbridge::sheets::{CredentialSource, SheetsClient};
use sheetbridge::store::SheetRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("loading configuration")?;

    let source = CredentialSource::from_env();
    log::info!("resolving service-account credentials from {source}");
    let auth = source
        .authenticator()
        .await
        .context("building Google authenticator")?;

    let client = SheetsClient::new(auth, config.spreadsheet_id.clone());
    let store = SheetRecordStore::new(
        Arc::new(client),
        config.sheet_name.clone(),
        config.key_column.clone(),
        config.custom_data_column.clone(),
    );

    let state = Arc::new(AppState {
        store,
        get_projection: config.get_projection.clone(),
        list_separator: config.list_separator.clone(),
    });
    let app = router(state, cors_layer(&config.allowed_origins));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    log::info!(
        "serving sheet '{}' of spreadsheet {} on {}",
        config.sheet_name,
        config.spreadsheet_id,
        config.bind_addr
    );
    axum::serve(listener, app).await?;
    Ok(())
}

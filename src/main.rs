use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;

use tecaj::client::HnbClient;
use tecaj::config::Settings;
use tecaj::render::Pages;
use tecaj::routes::{self, AppState};

fn preprocess() {
    dotenvy::dotenv().ok();
    env_logger::init();
}

#[actix_web::main]
async fn main() -> Result<()> {
    preprocess();
    let settings = Settings::from_env()?;
    log::info!("Settings loaded: {settings:?}");

    let client = HnbClient::new(&settings.api_url, settings.request_timeout)?;
    let state = web::Data::new(AppState {
        source: Arc::new(client),
        pages: Pages::new()?,
        default_currency: settings.default_currency.clone(),
        lookback_days: settings.lookback_days,
    });

    log::info!(
        "Serving exchange rates from {} on {}:{}",
        settings.api_url,
        settings.bind_address,
        settings.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}

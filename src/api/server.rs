// REST frontend: enqueues jobs onto the shared queue, nothing more.

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::api::{auth, routes};
use crate::api::handlers::AppState;
use crate::config::Config;

pub struct ApiServer {
    host: String,
    port: u16,
    api_key: Option<String>,
}

impl ApiServer {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: cfg.api_port,
            api_key: cfg.api_key.clone(),
        }
    }

    pub async fn run(self, pool: PgPool) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        if self.api_key.is_some() {
            info!("API key authentication is enabled");
        } else {
            info!("API key authentication is DISABLED; set API_KEY to secure the API");
        }
        info!(addr = %bind_addr, "starting TMDB mirror API server");

        let api_key = self.api_key.clone();
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(AppState { pool: pool.clone() }))
                .wrap(Logger::default())
                .wrap(auth::ApiKeyAuth::new(api_key.clone()))
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("failed to bind to {bind_addr}"))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}

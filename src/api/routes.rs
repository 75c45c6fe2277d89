// API route configuration.

use actix_web::web;

use crate::api::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/health", web::get().to(handlers::health))
        .route("/jobs/full-sweep", web::post().to(handlers::trigger_full_sweep))
        .route("/jobs/missing-ids", web::post().to(handlers::trigger_missing_ids))
        .route("/jobs/prune-deleted", web::post().to(handlers::trigger_prune_deleted))
        .route("/jobs/changes-sync", web::post().to(handlers::trigger_changes_sync))
        .route("/jobs/create-tables", web::post().to(handlers::trigger_create_tables))
        .route("/jobs/test-webhook", web::post().to(handlers::trigger_test_webhook))
        .route("/movies/{tmdb_id}", web::post().to(handlers::add_movie))
        .route("/series/{tmdb_id}", web::post().to(handlers::add_series));
}

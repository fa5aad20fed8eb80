//! HTTP API built on axum.
//!
//! All JSON routes live under `/api`. Short-link redirects are served from
//! `/s/{code}/` and uploaded images from `/media/`. Handlers stay thin: they
//! extract the caller, call into [`crate::core`] and shape the result through
//! [`serializers`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod serializers;

#[cfg(test)]
mod tests;

use crate::{
    config::settings::Settings,
    errors::{Error, Result},
    media::MediaStore,
};
use axum::{
    Router,
    http::{
        Method, Uri,
        header::{AUTHORIZATION, CONTENT_TYPE},
        uri::PathAndQuery,
    },
    routing::{get, post, put},
};
use handlers::{catalog, links, recipes, tokens, users};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use url::Url;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Shared connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Runtime settings.
    pub settings: Arc<Settings>,
    /// Where uploaded images live.
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    /// Absolute URL of the current request, as clients see it.
    pub fn request_url(&self, uri: &Uri) -> Result<Url> {
        let path = uri.path_and_query().map_or("/", PathAndQuery::as_str);
        Url::parse(&self.settings.absolute_url(path)).map_err(|e| Error::Config {
            message: format!("Invalid public URL: {e}"),
        })
    }

    /// Drops a stored file that no row points at. Failures are only logged so
    /// that the error which caused the cleanup is the one reported.
    pub async fn discard_media(&self, path: &str) {
        if let Err(err) = self.media.delete(path).await {
            warn!("Could not remove orphaned media {}: {}", path, err);
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/users/", get(users::list_users).post(users::create_user))
        .route("/users/me/", get(users::me))
        .route("/users/me/avatar/", put(users::put_avatar).delete(users::delete_avatar))
        .route("/users/set_password/", post(users::set_password))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route("/users/:id/", get(users::get_user))
        .route(
            "/users/:id/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/auth/token/login/", post(tokens::login))
        .route("/auth/token/logout/", post(tokens::logout))
        .route("/tags/", get(catalog::list_tags))
        .route("/tags/:id/", get(catalog::get_tag))
        .route("/ingredients/", get(catalog::list_ingredients))
        .route("/ingredients/:id/", get(catalog::get_ingredient))
        .route("/recipes/", get(recipes::list_recipes).post(recipes::create_recipe))
        .route(
            "/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/:id/",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/favorite/",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart/",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/recipes/:id/get-link/", get(links::get_link));

    let media_dir = ServeDir::new(&state.settings.media_root);
    Router::new()
        .nest("/api", api)
        .route("/s/:code/", get(links::redirect))
        .nest_service("/media", media_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.settings.bind_addr.clone();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

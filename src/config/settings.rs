//! Runtime settings loaded from environment variables.
//!
//! Every value has a default so a bare `cargo run` starts a usable local server.
//! `.env` files are loaded by `main` through `dotenvy` before this is read.

use std::path::PathBuf;

/// Settings shared by every request handler.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
    /// Absolute origin used to build links (short links, media, pagination)
    pub public_url: String,
    /// Directory uploaded images are written to
    pub media_root: PathBuf,
    /// Path of the seed file with tags and the ingredient catalogue
    pub seed_config: PathBuf,
}

impl Settings {
    /// Reads settings from `FOODGRAM_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("FOODGRAM_BIND_ADDR", "0.0.0.0:8000"),
            public_url: normalize_origin(&env_or("FOODGRAM_PUBLIC_URL", "http://localhost:8000")),
            media_root: PathBuf::from(env_or("FOODGRAM_MEDIA_ROOT", "data/media")),
            seed_config: PathBuf::from(env_or("FOODGRAM_SEED_CONFIG", "config.toml")),
        }
    }

    /// Builds an absolute URL from a path starting with `/`.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_url)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn normalize_origin(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_has_single_slash() {
        let settings = Settings {
            bind_addr: "127.0.0.1:0".to_string(),
            public_url: normalize_origin("http://example.com/"),
            media_root: PathBuf::from("media"),
            seed_config: PathBuf::from("config.toml"),
        };
        assert_eq!(settings.absolute_url("/s/abc123/"), "http://example.com/s/abc123/");
    }
}

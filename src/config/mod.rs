/// Database configuration and connection management
pub mod database;

/// Tag and ingredient seeding from config.toml
pub mod seed;

/// Runtime settings read from environment variables
pub mod settings;

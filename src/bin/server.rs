use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use auth_gateway::auth::password::PasswordPolicy;
use auth_gateway::auth::token::TokenManager;
use auth_gateway::config::ServerConfig;
use auth_gateway::core::gateway::{CredentialGateway, GatewaySettings};
use auth_gateway::handlers::{routes, AppState};
use auth_gateway::security_logger::{SecurityEvent, SecurityLogger};
use auth_gateway::storage::{LocalObjectStore, LockoutPolicy, MemoryUserStore, ObjectStore, UserStore};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Initialize env
    match dotenvy::dotenv() {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, issuer={}, token lifetime={}m",
        config.host, config.port, config.jwt_issuer, config.access_token_minutes
    );

    let security_logger = Arc::new(SecurityLogger::new());
    security_logger.clone().start_cleanup_task();

    if !config.enable_tls && !config.development_mode {
        security_logger
            .log_event(SecurityEvent::ConfigurationWarning {
                component: "server".to_string(),
                warning: "TLS is disabled; bearer tokens will travel in clear text".to_string(),
            })
            .await;
    }

    let tokens = Arc::new(TokenManager::new(
        &config.jwt_key,
        &config.jwt_issuer,
        &config.jwt_audience,
        config.access_token_lifetime(),
    ));

    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::with_policies(
        PasswordPolicy::default(),
        LockoutPolicy {
            allowed_for_new_users: true,
            lockout_on_failure: config.lockout_on_failure,
            max_failed_attempts: config.lockout_max_attempts,
            duration: chrono::Duration::minutes(config.lockout_minutes),
        },
    ));

    let objects: Arc<dyn ObjectStore> = match LocalObjectStore::new(
        config.object_store_root.clone(),
        &config.object_store_container,
        &config.object_store_public_url,
    ) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(CredentialGateway::new(
        users,
        objects,
        tokens.clone(),
        security_logger.clone(),
        GatewaySettings {
            default_photo_url: config.default_photo_url.clone(),
            min_auth_duration: config.min_auth_duration,
        },
    ));

    let routes = routes(AppState {
        gateway,
        tokens,
        security_logger,
        max_upload_bytes: config.max_upload_bytes,
        blob_root: config.object_store_root.clone(),
    });

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    match (config.enable_tls, &config.tls_cert_path, &config.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            info!("Starting auth gateway with TLS on {}", addr);
            warp::serve(routes)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .run(addr)
                .await;
        }
        _ => {
            info!("Starting auth gateway on {}", addr);
            warp::serve(routes).run(addr).await;
        }
    }
}

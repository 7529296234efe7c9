//! timeline-auth entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Decode the token signing keys (fatal on failure)
//! 3. Derive the admin credential digest
//! 4. Build router with API routes + CORS
//! 5. Serve until SIGINT/SIGTERM
//!
//! Also supports a `keygen` subcommand that prints a fresh Ed25519 key pair.

use std::sync::Arc;
use timeline_auth::{
    auth::{generate_keypair_pem, AdminCredentials, AppState, TokenManager},
    config::Config,
    routes,
};

fn print_keygen_usage() {
    eprintln!("Usage: timeline-auth keygen");
    eprintln!();
    eprintln!("Generate an Ed25519 key pair for SECRET_KEY / PUBLIC_KEY.");
    eprintln!("The private key is printed first, then the public key.");
}

fn keygen() {
    match generate_keypair_pem() {
        Ok((private_pem, public_pem)) => {
            print!("{}", private_pem);
            print!("{}", public_pem);
        }
        Err(e) => {
            eprintln!("Error generating keypair: {}", e);
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Check for keygen subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "keygen" {
        if args.len() != 2 {
            print_keygen_usage();
            std::process::exit(1);
        }
        keygen();
        return;
    }
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting timeline-auth on {}", config.bind_addr);

    // Keys are decoded once; a bad key must stop startup
    let tokens = TokenManager::new(&config.secret_key, &config.public_key)
        .expect("Failed to load token signing keys")
        .with_ttl(config.token_ttl);

    let credentials = AdminCredentials::new(&config.admin_email, &config.admin_password)
        .expect("Failed to derive admin credentials");
    tracing::info!("Admin user '{}' configured", config.admin_email);

    // Build shared state
    let state = AppState {
        tokens: Arc::new(tokens),
        credentials: Arc::new(credentials),
        config: Arc::new(config.clone()),
    };

    let cors = routes::cors_layer(&config.cors_origins);

    let app = routes::api_router(&state).layer(cors).with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server exited");
}

// Course Review - Web Server

use course_review::{open_database, router, AppState, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.logging.init();
    config.warn_on_defaults();
    info!(version = course_review::VERSION, "course-review starting");

    // Open database (tables are created if absent)
    let conn = match open_database(&config.database_path) {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };
    info!(path = %config.database_path.display(), "database opened");

    let state = AppState::new(conn, &config.admin_password, &config.secret_key);
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.bind_addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };
    info!(addr = %config.bind_addr, "listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("course-review stopped");
}

#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use growth_planner::{http_api, load_schedule};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("GROWTH_PLANNER_HTTP_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    let path = PathBuf::from(
        std::env::var("GROWTH_PLANNER_SCHEDULE")
            .unwrap_or_else(|_| "schedule/weekly-schedule.yaml".to_string()),
    );

    let document = load_schedule(&path)?;
    println!(
        "growth-planner HTTP API serving {} on http://{addr}",
        path.display()
    );
    http_api::serve(addr, http_api::AppState::with_path(document, path)).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}

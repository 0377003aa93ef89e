use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let max_age = match std::env::var("CACHE_MAX_AGE") {
        Ok(v) if v.eq_ignore_ascii_case("none") => None,
        Ok(v) => Some(v.parse().unwrap_or(mock_server::DEFAULT_MAX_AGE)),
        Err(_) => Some(mock_server::DEFAULT_MAX_AGE),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, ?max_age, "listening");
    mock_server::run_with_max_age(listener, max_age).await
}

use std::net::SocketAddr;

use bills_admin::{config, connect, routes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!("startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = config::load()?;

    let ip = settings.host.parse::<std::net::IpAddr>()?;
    let addr = SocketAddr::from((ip, settings.port));

    let state = connect(settings)?;
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("admin panel listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

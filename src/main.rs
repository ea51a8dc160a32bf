use axum::serve;
use odata_demo_rust::build_app;
use odata_demo_rust::config::AppConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hyper", LevelFilter::Warn)
        .parse_default_env()
        .init();

    println!("OData Demo: in-memory entity service");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, root=/{}",
        config.server.host, config.server.port, config.service.root
    );

    let app = build_app(&config)?;

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!(
        "OData service running on http://{}/{}",
        bind_address, config.service.root
    );

    serve(listener, app).await?;

    Ok(())
}

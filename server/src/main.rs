use anyhow::Result;
use clap::Parser;
use searchcore::{Engine, EngineConfig};
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Re-index documents after every update
    #[arg(long, default_value_t = false)]
    reindex_on_update: bool,
    /// Remove postings of deleted documents
    #[arg(long, default_value_t = false)]
    purge_on_delete: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = EngineConfig::persistent(&args.index)
        .reindex_on_update(args.reindex_on_update)
        .purge_on_delete(args.purge_on_delete);
    let engine = Engine::open(config)?;
    let app = build_app(engine.clone(), std::env::var("ADMIN_TOKEN").ok());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, documents = engine.count()?, "server listening");
    axum::serve(listener, app).await?;
    engine.flush()?;
    Ok(())
}

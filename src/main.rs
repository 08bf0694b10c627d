use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use swapi_people_loader::Database;
use swapi_people_loader::Ingestor;
use swapi_people_loader::SwapiClient;
use swapi_people_loader::config::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let client = reqwest::Client::builder().build()?;
    let swapi = SwapiClient::new(client, &args.base_url).with_timeout(args.timeout());

    let database = Arc::new(Database::connect(&args.database_url, args.max_connections).await?);
    database.ensure_schema().await?;

    let ingestor = Ingestor::new(swapi, database.clone(), args.batch_size.into());
    let report = ingestor.run().await;

    database.close().await;
    report?;

    println!("{:?}", start.elapsed());

    Ok(())
}

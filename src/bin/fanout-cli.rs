use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fanout-cli")]
#[command(about = "Query a running fan-out aggregator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the health endpoint
    Health,
    /// Fetch the aggregate response
    Aggregate {
        /// Aggregation path segment
        #[arg(short, long, default_value = "app")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Aggregate { path } => {
            client
                .get(format!("{}/{}", base, path.trim_start_matches('/')))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json)?;
            if status.is_success() {
                println!("{}", pretty);
            } else {
                eprintln!("Error: service returned status {}", status);
                eprintln!("{}", pretty);
            }
        }
        Err(_) => {
            eprintln!("Error: service returned status {} with a non-JSON body", status);
            eprintln!("Response: {}", text);
        }
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(format!("request failed with status {}", status).into())
    }
}

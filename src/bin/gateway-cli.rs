use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for a running enclave gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show network status of the first running enclave
    Status,
    /// List running enclaves
    Enclaves,
    /// Call a JSON-RPC method on the enclave's node
    Rpc {
        method: String,
        /// Positional parameter as JSON; repeat for more
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Fetch a block with full transactions
    Block { number: u64 },
    /// Fetch a transaction by hash
    Tx { hash: String },
    /// Show the block explorer URL
    Explorer,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/status", base)),
        Commands::Enclaves => client.get(format!("{}/enclaves", base)),
        Commands::Rpc { method, params } => {
            for param in params {
                if let Err(e) = serde_json::from_str::<Value>(param) {
                    return Err(format!("parameter {:?} is not valid JSON: {}", param, e).into());
                }
            }
            let query: Vec<(&str, &str)> = params.iter().map(|p| ("params", p.as_str())).collect();
            client.get(format!("{}/rpc/{}", base, method)).query(&query)
        }
        Commands::Block { number } => client.get(format!("{}/block/{}", base, number)),
        Commands::Tx { hash } => client.get(format!("{}/transaction/{}", base, hash)),
        Commands::Explorer => client.get(format!("{}/explorer", base)),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

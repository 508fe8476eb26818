use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "control-cli")]
#[command(about = "Management CLI for the proxy control plane", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API key; omit when the server runs without auth.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, TTL and the last reconcile report
    Status,
    /// List merged backends with their source
    Backends,
    /// Force a reconcile and reload
    Sync,
    /// Register (or heartbeat) a runtime backend
    Register {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        weight: Option<u32>,
        #[arg(long)]
        gpu: Option<f64>,
        #[arg(long)]
        vram: Option<f64>,
    },
    /// Override the weight of a backend
    SetWeight {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        weight: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/api/status", cli.url)),
        Commands::Backends => client.get(format!("{}/api/backends", cli.url)),
        Commands::Sync => client.post(format!("{}/api/sync", cli.url)),
        Commands::Register { ip, port, weight, gpu, vram } => client
            .post(format!("{}/api/register", cli.url))
            .json(&json!({
                "ip": ip,
                "port": port,
                "weight": weight,
                "gpu_usage": gpu,
                "vram_usage": vram,
            })),
        Commands::SetWeight { ip, port, weight } => client
            .post(format!("{}/api/backends/{}/{}/weight", cli.url, ip, port))
            .json(&json!({ "weight": weight })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control plane returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

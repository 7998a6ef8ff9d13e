use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Inspect a running posalpro-guard through its admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show limiter, audit and CSRF counters
    Status,
    /// List audit entries, optionally filtered
    Audit {
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        success: Option<bool>,
    },
    /// List high/critical or failed audit entries
    Events,
    /// Show remaining quota for a client identifier in every tier
    Limits {
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Audit { action, ip, severity, success } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(action) = action {
                query.push(("action", action));
            }
            if let Some(ip) = ip {
                query.push(("ip_address", ip));
            }
            if let Some(severity) = severity {
                query.push(("severity", severity));
            }
            if let Some(success) = success {
                query.push(("success", success.to_string()));
            }
            client.get(format!("{}/admin/audit", cli.url)).query(&query)
        }
        Commands::Events => client.get(format!("{}/admin/security-events", cli.url)),
        Commands::Limits { identifier } => {
            client.get(format!("{}/admin/rate-limits/{}", cli.url, identifier))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Some(retry_after) = res.headers().get("retry-after") {
            eprintln!("Retry after: {}s", retry_after.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

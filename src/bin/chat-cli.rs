use clap::Parser;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(about = "Send one message to a running chat relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// ID token of the signed-in user.
    #[arg(short, long, env = "CHAT_ID_TOKEN")]
    token: String,

    /// Message to send.
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/chat", cli.url.trim_end_matches('/')))
        .bearer_auth(&cli.token)
        .json(&json!({ "message": cli.message }))
        .send()
        .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Some(id) = request_id {
            eprintln!("Request ID: {}", id);
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("relay returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    match json.get("answer").and_then(Value::as_str) {
        Some(answer) => println!("{}", answer),
        None => println!("{}", serde_json::to_string_pretty(&json)?),
    }
    Ok(())
}

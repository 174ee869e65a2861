//! Pool Bot Binary
//!
//! Watches one Raydium pool and trades it through Jito bundles.
//!
//! ## Setup
//!
//! 1. Create a `config.toml` (see `config.example.toml`).
//! 2. Optionally keep the secret key out of the file with a `.env`:
//!    ```text
//!    APP_WALLET__PRIVATE_KEY=YourBase58SecretKey
//!    ```
//! 3. Run the bot:
//!    ```bash
//!    cargo run --bin pool_bot -- config.toml
//!    ```

use raydium_bundle_bot::runner::BotRunner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment overrides for the config file
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let default_config = "config.toml".to_string();
    let config_path = args.get(1).unwrap_or(&default_config);
    if !std::path::Path::new(config_path).exists() {
        eprintln!("Config file '{}' not found. Please create one.", config_path);
        std::process::exit(1);
    }

    let runner = match BotRunner::new(config_path) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runner.run().await {
        eprintln!("Bot execution error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

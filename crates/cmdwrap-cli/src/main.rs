// cmdwrap CLI Entry Point

use clap::Parser;
use cmdwrap_cli::{run_cli, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run_cli(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cmdwrap: {}", e.user_message());
            e.exit_code()
        }
    };

    std::process::exit(code);
}

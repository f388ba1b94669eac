use market_intent_router::{api::user_error, api::WELCOME, config::Config, graph::DispatchGraph};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so answers stay readable on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let graph = DispatchGraph::from_config(&config)?;
    info!(model = %config.model.model, "Intent router ready");

    println!("{}\n", WELCOME);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        match graph.run_query(query).await {
            Ok(state) => {
                let answer = state.last_message().unwrap_or_default();
                let mut stdout = std::io::stdout();
                for ch in answer.chars() {
                    write!(stdout, "{}", ch)?;
                    stdout.flush()?;
                }
                writeln!(stdout, "\n")?;
            }
            Err(e) => println!("{}\n", user_error(&e)),
        }
    }

    Ok(())
}

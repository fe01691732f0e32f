//! Question answering command line tool.
//!
//! Answers a single `--query`, or runs an interactive loop over stdin until `quit`, `exit`, `q`
//! or end of input.
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use docchat::{chat::RagChatbot, config::Config, format, logging};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

#[derive(Parser)]
#[command(
    name = "docchat-chat",
    version,
    about = "Ask questions about indexed documents"
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["query", "interactive"])
))]
struct Cli {
    /// Answer one question and exit.
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,
    /// Read questions from stdin until `quit`.
    #[arg(long)]
    interactive: bool,
    /// Index to use instead of `PINECONE_INDEX_NAME`.
    #[arg(long, value_name = "NAME")]
    index: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    config
        .require_openai_api_key()
        .context("answering questions needs an OpenAI API key")?;
    let index_name = cli.index.clone().unwrap_or_else(|| config.index_name.clone());
    let bot = RagChatbot::from_config(&config, &index_name)
        .await
        .with_context(|| format!("failed to initialize chatbot for index {index_name}"))?;

    if let Some(query) = &cli.query {
        let result = bot.chat(query).await;
        print!("{}", format::chat_answer(&result));
        return Ok(());
    }

    interactive(&bot).await
}

async fn interactive(bot: &RagChatbot) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Document chat - ask questions about your documents!\nType 'quit' to exit\n\n")
        .await?;

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("failed to read from stdin")? else {
            break;
        };
        let question = line.trim();
        if EXIT_COMMANDS.contains(&question.to_lowercase().as_str()) {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let result = bot.chat(question).await;
        let rendered = format!("{}\n", format::interactive_answer(&result));
        stdout.write_all(rendered.as_bytes()).await?;
    }

    stdout.write_all(b"Goodbye!\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_and_interactive_are_exclusive() {
        assert!(Cli::try_parse_from(["docchat-chat"]).is_err());
        assert!(Cli::try_parse_from(["docchat-chat", "--query", "hi", "--interactive"]).is_err());
        let cli =
            Cli::try_parse_from(["docchat-chat", "--interactive", "--index", "docs"]).unwrap();
        assert!(cli.interactive);
        assert_eq!(cli.index.as_deref(), Some("docs"));
    }
}

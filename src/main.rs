use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use file_assistant::{Agent, AgentEvent, AssistantConfig, ToolProtocol, assistant};

const GREETING: &str = "Hi! I'm your file assistant. Which file would you like to work on? \
(Please give its full path.)";

const HELP: &str = "Commands:
  /clear           forget the conversation so far
  /reset           start over with a freshly initialized agent
  /help            show this help
  exit, quit, 退出  leave

Example: read test.txt on my desktop, translate it into English and save it \
in a folder called TranslationResult as en_test.txt";

/// Chat-driven file assistant: read, translate and save documents.
///
/// DASHSCOPE_API_KEY, DASHSCOPE_BASE_URL and FILE_ASSISTANT_MODEL are read
/// from the environment; the options below take precedence.
#[derive(Debug, Parser)]
#[command(name = "file-assistant", version)]
struct Cli {
    /// API key of the completion service
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Model used for decisions and translation [default: qwen-plus]
    #[arg(long)]
    model: Option<String>,

    /// How tools are offered to the model
    #[arg(long, value_enum, default_value_t = ToolProtocol::Native)]
    protocol: ToolProtocol,

    /// Directory saved folders are created in (defaults to the desktop)
    #[arg(long)]
    save_root: Option<PathBuf>,

    /// Timeout for each completion request, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Token limit for each completion (left to the service when unset)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Log agent steps to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run this instruction once and exit instead of starting a chat
    instruction: Option<String>,
}

impl Cli {
    /// Options layered over `base`.
    fn config(&self, base: AssistantConfig) -> AssistantConfig {
        let mut config = AssistantConfig {
            protocol: self.protocol,
            ..base
        };
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if self.save_root.is_some() {
            config.save_root = self.save_root.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        config
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Skip,
    Exit,
    Help,
    Clear,
    Reset,
    Instruction(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Command::Skip,
            "exit" | "quit" | "退出" => Command::Exit,
            "/help" => Command::Help,
            "/clear" => Command::Clear,
            "/reset" => Command::Reset,
            instruction => Command::Instruction(instruction),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "file_assistant=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config(AssistantConfig::from_env());
    let agent = assistant::initialize(&config).context("failed to initialize the agent")?;

    if let Some(instruction) = &cli.instruction {
        println!("{}", assistant::run(&agent, instruction).await);
        return Ok(());
    }

    chat(agent, &config).await
}

async fn chat(mut agent: Agent, config: &AssistantConfig) -> anyhow::Result<()> {
    println!("{}", GREETING);
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = match Command::parse(&line) {
            Command::Skip => continue,
            Command::Exit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Clear => {
                agent.clear_history().await;
                println!("Conversation cleared.");
                continue;
            }
            Command::Reset => {
                match assistant::initialize(config) {
                    Ok(fresh) => {
                        agent = fresh;
                        println!("Agent reinitialized.");
                    }
                    Err(err) => eprintln!("Reset failed: {}", err),
                }
                continue;
            }
            Command::Instruction(input) => input,
        };

        let mut events = agent.stream(input);
        while let Some(event) = events.next().await {
            match event {
                AgentEvent::ToolCall { name, .. } => eprintln!("  -> {}", name),
                AgentEvent::Finished(report) => println!("Assistant: {}", report.answer),
                _ => {}
            }
        }
    }

    println!("Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_commands() {
        assert_eq!(Command::parse("  "), Command::Skip);
        assert_eq!(Command::parse("退出"), Command::Exit);
        assert_eq!(Command::parse("quit\n"), Command::Exit);
        assert_eq!(Command::parse("/reset"), Command::Reset);
        assert_eq!(Command::parse("/clear"), Command::Clear);
        assert_eq!(
            Command::parse(" read a.txt "),
            Command::Instruction("read a.txt")
        );
    }

    #[test]
    fn options_override_environment() {
        let cli = Cli::parse_from(["file-assistant", "--model", "qwen-max", "--max-tokens", "2048"]);
        let base = AssistantConfig {
            api_key: Some("sk-env".into()),
            model: "qwen-turbo".into(),
            ..AssistantConfig::default()
        };

        let config = cli.config(base);

        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.model, "qwen-max");
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.protocol, ToolProtocol::Native);
    }

    #[test]
    fn environment_model_is_kept_without_option() {
        let cli = Cli::parse_from(["file-assistant"]);
        let base = AssistantConfig {
            model: "qwen-turbo".into(),
            ..AssistantConfig::default()
        };

        assert_eq!(cli.config(base).model, "qwen-turbo");
    }
}

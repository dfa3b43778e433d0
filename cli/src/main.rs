use anyhow::Result;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use relay_core::{
    CalculatorTool, Orchestrator, ProviderRegistry, SessionMemoryManager, ToolRegistry, config,
    create_cache, create_session_manager,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod onboard;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "relay - chat with any model through one pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Onboard,
    Chat {
        #[arg(short, long)]
        message: Option<String>,
        /// Overrides the configured model for this run.
        #[arg(long)]
        model: Option<String>,
        /// Session id; a fresh one is generated when omitted.
        #[arg(long)]
        session: Option<String>,
        /// Print chunks as they arrive.
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                message: None,
                model: None,
                session: None,
                stream: false,
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat {
            message,
            model,
            session,
            stream,
        } => {
            let config = config::load_config()?;
            let stream = stream || config.stream.enabled;

            let registry = ProviderRegistry::with_defaults();
            let (provider, embedder) = registry.resolve_config(&config)?;

            let sessions = create_session_manager(&config.memory);
            let session_id = session.unwrap_or_else(SessionMemoryManager::new_session_id);
            info!("Using session {}", session_id);

            let tools = Arc::new(ToolRegistry::new());
            tools.register(Arc::new(CalculatorTool::new()));

            let mut orchestrator = Orchestrator::new(provider)
                .with_embedder(embedder)
                .with_tools(tools)
                .with_memory(Arc::new(sessions.scoped(session_id)))
                .with_cache_ttl(config.cache.ttl());

            if let Some(cache) = create_cache(&config.cache).await? {
                orchestrator = orchestrator.with_cache(cache);
            }
            if let Some(prompt) = &config.system_prompt {
                orchestrator = orchestrator.with_system_prompt(prompt.clone());
            }

            let model = model.as_deref();

            if let Some(msg) = message {
                if let Err(e) = respond(&orchestrator, &msg, model, stream).await {
                    eprintln!("❌ Error: {}", e);
                    anyhow::bail!("Chat failed: {}", e);
                }
            } else {
                run_repl(&orchestrator, model, stream).await?;
            }
        }
    }

    Ok(())
}

async fn respond(
    orchestrator: &Orchestrator,
    message: &str,
    model: Option<&str>,
    stream: bool,
) -> relay_core::Result<()> {
    if !stream {
        let response = orchestrator.chat(message, model).await?;
        println!("{}", response);
        return Ok(());
    }

    let mut chunks = orchestrator.stream_chat(message, model);
    let mut stdout = io::stdout();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        print!("{}", chunk);
        let _ = stdout.flush();
    }
    println!();
    Ok(())
}

async fn run_repl(orchestrator: &Orchestrator, model: Option<&str>, stream: bool) -> Result<()> {
    println!(
        "relay · {} / {}",
        orchestrator.provider().vendor(),
        model.unwrap_or(orchestrator.provider().model())
    );
    println!("Type your message, /clear to forget the conversation, /exit to quit.\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Ok(_) => {}
        }

        let input = input.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => {
                println!("👋 Goodbye!");
                break;
            }
            "/clear" => {
                match orchestrator.clear_memory().await {
                    Ok(()) => println!("Conversation cleared.\n"),
                    Err(e) => eprintln!("❌ Error: {}", e),
                }
                continue;
            }
            _ => {}
        }

        println!();
        if let Err(e) = respond(orchestrator, input, model, stream).await {
            eprintln!("❌ Error: {}", e);
        }
        println!();
    }

    Ok(())
}

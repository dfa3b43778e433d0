use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use relay_core::config::Config;

const BANNER: &str = r"
    -------------------------------

    ██████╗ ███████╗██╗      █████╗ ██╗   ██╗
    ██╔══██╗██╔════╝██║     ██╔══██╗╚██╗ ██╔╝
    ██████╔╝█████╗  ██║     ███████║ ╚████╔╝
    ██╔══██╗██╔══╝  ██║     ██╔══██║  ╚██╔╝
    ██║  ██║███████╗███████╗██║  ██║   ██║
    ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝  ╚═╝   ╚═╝

    -------------------------------
";

struct VendorPreset {
    name: &'static str,
    label: &'static str,
    needs_key: bool,
    models: &'static [&'static str],
    embedding_model: &'static str,
}

const VENDORS: &[VendorPreset] = &[
    VendorPreset {
        name: "openai",
        label: "OpenAI",
        needs_key: true,
        models: &["gpt-4o", "gpt-4o-mini", "gpt-5", "gpt-5-mini"],
        embedding_model: "text-embedding-3-small",
    },
    VendorPreset {
        name: "openrouter",
        label: "OpenRouter",
        needs_key: true,
        models: &[
            "openai/gpt-4o-mini",
            "anthropic/claude-3.5-sonnet",
            "meta-llama/llama-3.1-70b-instruct",
        ],
        embedding_model: "openai/text-embedding-3-small",
    },
    VendorPreset {
        name: "ollama",
        label: "Ollama (local)",
        needs_key: false,
        models: &["llama3.2", "qwen2.5", "mistral"],
        embedding_model: "nomic-embed-text",
    },
];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_vendor() -> Result<&'static VendorPreset> {
    let labels: Vec<&str> = VENDORS.iter().map(|v| v.label).collect();

    let selection = Select::new()
        .with_prompt("Select your provider")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(&VENDORS[selection])
}

fn setup_api_key(vendor: &VendorPreset) -> Result<String> {
    if !vendor.needs_key {
        println!("  {} No API key needed for {}", style("✓").green(), vendor.label);
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", vendor.label))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn setup_model(vendor: &VendorPreset) -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your model")
        .items(vendor.models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(vendor.models[selection].to_string())
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to relay!").white().bold());
    println!(
        "  {}",
        style("This wizard picks a provider and model for your chats.").dim()
    );
    println!();

    print_step(1, 3, "Provider");
    let vendor = setup_vendor()?;

    print_step(2, 3, "API Key Setup");
    let api_key = setup_api_key(vendor)?;

    print_step(3, 3, "Model Selection");
    let model = setup_model(vendor)?;

    let config = Config {
        vendor: vendor.name.to_string(),
        api_key,
        model,
        embedding_vendor: vendor.name.to_string(),
        embedding_model: vendor.embedding_model.to_string(),
        ..Default::default()
    };
    config.validate()?;

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(relay_core::config::get_config_path().display()).cyan()
    );
    println!(
        "  {} Responses cached in {}",
        style("→").green(),
        style(config.cache.dir.display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("relay chat").cyan().bold()
    );
    println!();

    Ok(config)
}

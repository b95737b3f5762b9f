use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ropesmith::{CodeModifier, CompletionProvider, ModifierConfig, OpenRouterProvider};
use std::fs;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "ropesmith",
    about = "Refactor Python with LLM-generated, validated Rope scripts",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Modify an existing Python file according to instructions
    Modify(ModifyArgs),
    /// Generate a new Python file from instructions alone
    Generate(GenerateArgs),
    /// List the models available from the provider
    Models,
}

#[derive(Args, Debug)]
struct ModifyArgs {
    /// File to modify
    file: PathBuf,

    /// Natural-language instructions
    instructions: String,

    /// Project root (defaults to the file's parent directory)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Override the configured model for this run
    #[arg(long)]
    model: Option<String>,

    /// Write the modified content back to the file instead of stdout
    #[arg(long)]
    write: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Natural-language instructions
    instructions: String,

    /// Where to write the generated code
    output: PathBuf,

    /// Override the configured model for this run
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Modify(args) => run_modify(args).await,
        Commands::Generate(args) => run_generate(args).await,
        Commands::Models => run_models().await,
    }
}

async fn run_modify(args: ModifyArgs) -> Result<()> {
    let modifier = build_modifier();
    let modified = modifier
        .modify_file(
            &args.file,
            &args.instructions,
            args.project.as_deref(),
            args.model.as_deref(),
        )
        .await?;

    if args.write {
        fs::write(&args.file, &modified)
            .with_context(|| format!("failed to write {}", args.file.display()))?;
        println!("File modified: {}", args.file.display());
    } else {
        print!("{}", modified);
    }
    Ok(())
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let modifier = build_modifier();
    let generated = modifier
        .generate_code(&args.instructions, args.model.as_deref())
        .await?;

    fs::write(&args.output, &generated)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Code generated: {}", args.output.display());
    Ok(())
}

async fn run_models() -> Result<()> {
    let config = ModifierConfig::from_env();
    let provider = OpenRouterProvider::new(config.api_key.clone());
    for model in provider.list_models().await? {
        println!("{}", model);
    }
    Ok(())
}

fn build_modifier() -> CodeModifier {
    let config = ModifierConfig::from_env();
    let provider = OpenRouterProvider::new(config.api_key.clone());
    CodeModifier::new(&config, Box::new(provider))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}

use std::{path::PathBuf, process};

use anyhow::Result;
use clap::{Parser, Subcommand};

use tourgate::{
    Language, Layout, default_root,
    config::GatewayConfig,
    i18n::catalog::Catalog,
    serve::ServeArgs,
};

#[derive(Parser, Debug)]
#[command(name = "tourgate", version, about = "Localization and error gateway for the tour platform")]
struct Cli {
    /// Override the workspace root directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway (HTTP and RPC surfaces).
    Serve(ServeArgs),

    /// Validate the locale bundles and report per-language coverage.
    Check {
        /// Bundle directory to check; defaults to `<root>/locales`.
        #[arg(long, value_name = "DIR")]
        locales: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(mut args) => {
            if args.root.is_none() {
                args.root = cli.root;
            }
            tourgate::serve::run(args).await
        }
        Command::Check { locales } => {
            let layout = resolve_layout(cli.root)?;
            let config = GatewayConfig::load(layout.config_path())?;
            let dir = locales
                .or_else(|| config.locales_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| layout.locales_dir().to_path_buf());
            handle_check(&dir, config.default_language)
        }
    }
}

fn resolve_layout(root_override: Option<PathBuf>) -> Result<Layout> {
    let root = match root_override {
        Some(path) => path,
        None => default_root()?,
    };
    Ok(Layout::new(root))
}

fn handle_check(dir: &PathBuf, default_language: Language) -> Result<()> {
    let catalog = Catalog::load_dir(dir, default_language)?;
    let reference = catalog.leaf_count(default_language);

    println!("Locale bundles in {}:", dir.display());
    for language in Language::ALL {
        if !catalog.has(language) {
            println!("  {:<6} missing", language.code());
            continue;
        }
        let leaves = catalog.leaf_count(language);
        let marker = if language == default_language { " (default)" } else { "" };
        println!("  {:<6} {leaves}/{reference} messages{marker}", language.code());
    }
    Ok(())
}

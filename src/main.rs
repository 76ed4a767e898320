use clap::{Parser, Subcommand};
use notion_site_sync::config::{self, SyncConfig};
use notion_site_sync::notion::NotionClient;
use notion_site_sync::remote::{JsonFileSource, PageSource, PropertyNames};
use notion_site_sync::{output, sync};
use std::path::{Path, PathBuf};

/// Where pages come from for commands that read the database.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Read pages from a JSON dump written by `export` instead of the API
    #[arg(long, value_name = "DUMP")]
    from: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "notion-site-sync")]
#[command(about = "Mirror a Notion database into a static site's markdown")]
#[command(long_about = "\
Mirror a Notion database into a static site's markdown

Every row of the database becomes one markdown file with front matter.
The Type property decides where it goes:

  Type = Home        → index.md              (the homepage)
  Type = Page        → _pages/<slug>.md      (listed in navigation)
  anything else      → _pages/<slug>.md      (hidden from navigation)

Files in those locations are owned by this tool: every run rewrites them,
and deletes the ones whose page no longer exists. Nothing else in the site
is touched.

Environment:
  NOTION_TOKEN         Integration token (required for API access)
  NOTION_DATABASE_ID   Database to mirror (overrides sync.toml)
  RUST_LOG             Log filter, e.g. notion_site_sync=debug

Run 'notion-site-sync gen-config' to generate a documented sync.toml.")]
#[command(version)]
struct Cli {
    /// Site root containing the home file and pages directory
    #[arg(long, default_value = ".", global = true)]
    site_root: PathBuf,

    /// Config file (defaults to sync.toml in the site root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch pages and rewrite the site to match
    Sync {
        #[command(flatten)]
        source: SourceArgs,
        /// Apply even when no pages were fetched but files would be deleted
        #[arg(long)]
        allow_empty: bool,
    },
    /// Show what `sync` would write and delete, without changing anything
    Plan {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Fetch pages from the API and save them as a JSON dump
    Export {
        /// Output file
        out: PathBuf,
    },
    /// Print a stock sync.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notion_site_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sync {
            source,
            allow_empty,
        } => {
            let config = config::load_config(&cli.site_root, cli.config.as_deref())?;
            let pages = page_source(&source, &config)?.fetch_pages()?;
            let plan = sync::plan(&pages, &cli.site_root, &config)?;
            if plan.is_suspiciously_empty() && !allow_empty {
                output::print_plan(&plan);
                return Err(format!(
                    "no pages fetched but {} managed files would be deleted; \
                     re-run with --allow-empty if the database really is empty",
                    plan.diff.to_delete.len()
                )
                .into());
            }
            let summary = sync::apply(&plan, &cli.site_root)?;
            output::print_summary(&summary);
        }
        Command::Plan { source } => {
            let config = config::load_config(&cli.site_root, cli.config.as_deref())?;
            let pages = page_source(&source, &config)?.fetch_pages()?;
            let plan = sync::plan(&pages, &cli.site_root, &config)?;
            output::print_plan(&plan);
        }
        Command::Export { out } => {
            let config = config::load_config(&cli.site_root, cli.config.as_deref())?;
            let client = NotionClient::new(config::notion_token()?, config.notion)?;
            let dump = client.fetch_dump()?;
            write_dump(&out, &dump)?;
            println!("Exported \u{2192} {}", out.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// The dump file when `--from` is given, otherwise the Notion API.
fn page_source(
    args: &SourceArgs,
    config: &SyncConfig,
) -> Result<Box<dyn PageSource>, Box<dyn std::error::Error>> {
    match &args.from {
        Some(path) => Ok(Box::new(JsonFileSource::new(
            path,
            PropertyNames::from_config(&config.notion),
        ))),
        None => Ok(Box::new(NotionClient::new(
            config::notion_token()?,
            config.notion.clone(),
        )?)),
    }
}

fn write_dump(path: &Path, dump: &serde_json::Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(dump)?;
    std::fs::write(path, json)
}

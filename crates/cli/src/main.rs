use anyhow::{Context, Result};
use atlas_extractor::PythonParser;
use atlas_graph::CodeGraph;
use atlas_ingest::{
    generate_config_template, load_config, IngestionPipeline, LoggingConfig, TemplateFormat,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logging::Verbosity;
use std::fs;
use std::path::PathBuf;

mod logging;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Build a knowledge graph from Python source", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one file and print its entities and relationships as JSON
    Parse(ParseArgs),

    /// Ingest a source tree into a knowledge graph
    Ingest(IngestArgs),

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct ParseArgs {
    /// Python file to extract
    file: PathBuf,

    /// Qualified path used for the file's entities (defaults to FILE as given)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct IngestArgs {
    /// Project directory to ingest
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Config file (default: search from ROOT upwards, then the home directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the graph document (nodes and edges) to this file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print stats as JSON (implies --quiet)
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show {
        /// Config file (default: search from the current directory upwards)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a configuration template with the defaults
    Init {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Json,
    Toml,
}

impl From<ConfigFormat> for TemplateFormat {
    fn from(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Json => TemplateFormat::Json,
            ConfigFormat::Toml => TemplateFormat::Toml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut verbosity = Verbosity {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Parse(args) => {
            logging::init(&LoggingConfig::default(), verbosity)?;
            run_parse(args)?;
        }
        Commands::Ingest(args) => {
            // keep stdout clean for JSON parsing
            if args.json {
                verbosity.quiet = true;
            }
            let config = load_config(args.config.as_deref(), Some(args.root.as_path()))
                .context("Failed to load configuration")?;
            logging::init(&config.logging, verbosity)?;
            run_ingest(args, config.ingestion).await?;
        }
        Commands::Config(ConfigCommand::Show { config }) => {
            let config =
                load_config(config.as_deref(), None).context("Failed to load configuration")?;
            logging::init(&config.logging, verbosity)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Config(ConfigCommand::Init { format }) => {
            logging::init(&LoggingConfig::default(), verbosity)?;
            println!("{}", generate_config_template(format.into())?);
        }
    }

    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let name = args
        .name
        .unwrap_or_else(|| args.file.to_string_lossy().replace('\\', "/"));

    let mut parser = PythonParser::new()?;
    let parsed = parser.parse_source(&name, &source)?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn run_ingest(args: IngestArgs, config: atlas_ingest::IngestionConfig) -> Result<()> {
    let pipeline = IngestionPipeline::new(&args.root, config).context("Invalid ingestion root")?;
    let mut graph = CodeGraph::new();
    let stats = pipeline.ingest(&mut graph).await?;

    if let Some(path) = &args.out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, graph.to_json_pretty()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Graph written to {}", path.display());
    }

    if args.json {
        let output = serde_json::json!({
            "stats": stats,
            "graph": {
                "nodes": graph.node_count(),
                "edges": graph.edge_count(),
                "unresolved": graph.unresolved_count(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{stats}");
    println!(
        "Graph: {} nodes, {} edges ({} unresolved)",
        graph.node_count(),
        graph.edge_count(),
        graph.unresolved_count()
    );
    for failure in &stats.failures {
        println!("  failed  {}: {}", failure.path, failure.error);
    }
    for skipped in &stats.skipped {
        println!("  skipped {}: {}", skipped.path, skipped.error);
    }
    Ok(())
}

use crate::config::{Config, load_config};
use crate::diagnostics::diagnose;
use crate::document::{Document, Suggestion, import_document};
use crate::ids::UuidIds;
use crate::ir::Direction;
use crate::layout::Viewport;
use crate::render::{render_svg, write_output_svg};
use crate::store::GraphStore;
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cmap", version, about = "Concept map layout, merge and diagnostics")]
pub struct Args {
    /// Config JSON file
    #[arg(short = 'c', long = "configFile", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug)]
pub struct IoArgs {
    /// Input document (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lay out the whole map
    Tidy {
        #[command(flatten)]
        io: IoArgs,
        /// Direction token: TB, TD, BT, LR, RL
        #[arg(short = 'd', long = "direction")]
        direction: Option<String>,
    },
    /// Lay out, then centre the map in a viewport
    Fit {
        #[command(flatten)]
        io: IoArgs,
        #[arg(short = 'd', long = "direction")]
        direction: Option<String>,
        #[arg(short = 'w', long = "width")]
        width: Option<f32>,
        #[arg(short = 'H', long = "height")]
        height: Option<f32>,
        #[arg(short = 'p', long = "padding")]
        padding: Option<f32>,
    },
    /// Merge a suggested subgraph into the map
    Merge {
        #[command(flatten)]
        io: IoArgs,
        /// Suggestion payload with newNodes/newEdges
        #[arg(short = 's', long = "suggestion")]
        suggestion: PathBuf,
    },
    /// Print advisory hierarchy diagnostics
    Diagnose {
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
    /// Render an SVG preview
    Render {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Validate an import document without changing it
    ImportCheck {
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Tidy { io, direction } => {
            let mut store = load_store(io.input.as_deref(), &config)?;
            let direction = parse_direction(direction.as_deref(), &config)?;
            store.tidy(direction);
            write_document(&store, io.output.as_deref())
        }
        Command::Fit {
            io,
            direction,
            width,
            height,
            padding,
        } => {
            let mut store = load_store(io.input.as_deref(), &config)?;
            let direction = parse_direction(direction.as_deref(), &config)?;
            let viewport = Viewport {
                width: width.unwrap_or(config.render.width),
                height: height.unwrap_or(config.render.height),
            };
            let zoom =
                store.center_and_fit(direction, viewport, padding.unwrap_or(config.render.padding));
            eprintln!("zoom: {zoom:.3}");
            write_document(&store, io.output.as_deref())
        }
        Command::Merge { io, suggestion } => {
            let mut store = load_store(io.input.as_deref(), &config)?;
            let payload = Suggestion::from_json(&std::fs::read_to_string(&suggestion)?)?;
            let report = store.merge(&payload, Instant::now())?;
            eprintln!("{}", report.summary());
            for dropped in &report.dropped {
                eprintln!("  {dropped}");
            }
            write_document(&store, io.output.as_deref())
        }
        Command::Diagnose { input } => {
            let store = load_store(input.as_deref(), &config)?;
            let findings = diagnose(store.graph(), &config.diagnostics);
            if findings.is_empty() {
                println!("no findings");
            }
            for finding in findings {
                println!("{finding}");
            }
            Ok(())
        }
        Command::Render { io } => {
            let store = load_store(io.input.as_deref(), &config)?;
            let svg = render_svg(store.graph(), &config.theme, &config.layout, &config.render);
            write_output_svg(&svg, io.output.as_deref())
        }
        Command::ImportCheck { input } => {
            let text = read_input(input.as_deref())?;
            let document = import_document(&text, &config.placement)?;
            println!(
                "ok: {} node(s), {} edge(s)",
                document.nodes.len(),
                document.edges.len()
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_store(input: Option<&Path>, config: &Config) -> Result<GraphStore> {
    let text = read_input(input)?;
    let document = import_document(&text, &config.placement)?;
    Ok(GraphStore::new("cli", config)
        .with_ids(UuidIds)
        .with_graph(document.to_graph()))
}

fn write_document(store: &GraphStore, output: Option<&Path>) -> Result<()> {
    let json = Document::from_graph(store.graph()).to_json()?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_direction(token: Option<&str>, config: &Config) -> Result<Direction> {
    match token {
        None => Ok(config.layout.direction),
        Some(token) => Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}` (expected TB, TD, BT, LR or RL)")),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

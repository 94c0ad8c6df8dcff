//! CLI commands for butterfly-route

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use butterfly_routing::formats::HierarchyFile;
use butterfly_routing::graph::InputEdge;
use butterfly_routing::matrix::distance_matrix;
use butterfly_routing::validate::{validate_hierarchy, verify_shortcuts};
use butterfly_routing::{
    BidirectionalQuery, ChConfig, ContractionGraph, Hierarchy, HierarchyBuilder, Outcome,
    RestrictionProvider, TurnRestrictionIndex, VertexId,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::input::{parse_vertex_list, read_edge_list, read_restrictions};
use crate::progress::BarProgress;

#[derive(Parser)]
#[command(name = "butterfly-route")]
#[command(version, about = "Contraction hierarchy builder and router", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Contract an edge list into a hierarchy file
    Build {
        /// Edge list (`from to weight [both|forward|backward]` per line)
        #[arg(short, long)]
        graph: PathBuf,

        /// Output hierarchy file
        #[arg(short, long)]
        output: PathBuf,

        /// Build a turn-aware hierarchy (U-turns banned)
        #[arg(long)]
        edge_based: bool,

        /// Turn restrictions; requires --edge-based
        #[arg(long)]
        restrictions: Option<PathBuf>,

        /// TOML file with contraction settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,

        /// Print contraction statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Shortest route between two vertices
    Route {
        /// Hierarchy file
        #[arg(long)]
        hierarchy: PathBuf,

        #[arg(long)]
        from: VertexId,

        #[arg(long)]
        to: VertexId,

        /// Turn restrictions the hierarchy was built with
        #[arg(long)]
        restrictions: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Many-to-many distance table (JSON)
    Matrix {
        #[arg(long)]
        hierarchy: PathBuf,

        /// Comma-separated source vertices
        #[arg(long)]
        sources: String,

        /// Comma-separated target vertices
        #[arg(long)]
        targets: String,

        #[arg(long)]
        restrictions: Option<PathBuf>,
    },

    /// Compare random queries against Dijkstra on the original edge list
    Validate {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long)]
        hierarchy: PathBuf,

        #[arg(long)]
        restrictions: Option<PathBuf>,

        /// Number of random queries
        #[arg(long, default_value = "1000")]
        queries: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print hierarchy metadata (JSON)
    Inspect {
        #[arg(long)]
        hierarchy: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            graph,
            output,
            edge_based,
            restrictions,
            config,
            quiet,
            json,
        } => build(&graph, &output, edge_based, restrictions.as_deref(), config.as_deref(), quiet, json),
        Commands::Route {
            hierarchy,
            from,
            to,
            restrictions,
            json,
        } => route(&hierarchy, from, to, restrictions.as_deref(), json),
        Commands::Matrix {
            hierarchy,
            sources,
            targets,
            restrictions,
        } => matrix(&hierarchy, &sources, &targets, restrictions.as_deref()),
        Commands::Validate {
            graph,
            hierarchy,
            restrictions,
            queries,
            seed,
        } => validate(&graph, &hierarchy, restrictions.as_deref(), queries, seed),
        Commands::Inspect { hierarchy } => inspect(&hierarchy),
    }
}

fn load_restrictions(path: Option<&Path>) -> Result<Option<TurnRestrictionIndex>> {
    path.map(read_restrictions).transpose()
}

fn load_hierarchy(path: &Path) -> Result<Hierarchy> {
    HierarchyFile::read(path).with_context(|| format!("failed to load hierarchy {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build(
    graph_path: &Path,
    output: &Path,
    edge_based: bool,
    restrictions: Option<&Path>,
    config: Option<&Path>,
    quiet: bool,
    json: bool,
) -> Result<()> {
    if restrictions.is_some() && !edge_based {
        bail!("--restrictions only applies to --edge-based builds");
    }
    let config = match config {
        Some(path) => ChConfig::load(path)?,
        None => ChConfig::default(),
    };
    let base = read_edge_list(graph_path)?;
    let index = load_restrictions(restrictions)?.unwrap_or_default();
    info!(
        vertices = base.vertex_count(),
        edges = base.edge_count(),
        restricted_vertices = index.n_restricted_nodes(),
        edge_based,
        "edge list loaded"
    );

    let mut graph = ContractionGraph::from_provider(&base, edge_based, |e: &InputEdge| {
        Some((e.weight, e.direction))
    })?;

    let progress = BarProgress::new(quiet);
    let stats = if edge_based {
        HierarchyBuilder::edge_based(config, &index)
            .with_progress(&progress)
            .run(&mut graph)?
    } else {
        HierarchyBuilder::vertex_based(config)
            .with_progress(&progress)
            .run(&mut graph)?
    };

    let hierarchy = graph.into_hierarchy()?;
    HierarchyFile::write(output, &hierarchy)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if json {
        print_json(&stats)?;
    } else {
        println!(
            "contracted {} vertices, added {} shortcuts in {} ms",
            stats.contracted, stats.shortcuts_added, stats.elapsed_ms
        );
        println!("wrote {}", output.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct RouteOutput<'a> {
    from: VertexId,
    to: VertexId,
    weight: f32,
    path: &'a [VertexId],
}

fn route(
    hierarchy_path: &Path,
    from: VertexId,
    to: VertexId,
    restrictions: Option<&Path>,
    json: bool,
) -> Result<()> {
    let hierarchy = load_hierarchy(hierarchy_path)?;
    let index = load_restrictions(restrictions)?;

    let mut query = BidirectionalQuery::between(&hierarchy, from, to);
    if let Some(index) = &index {
        query = query.with_restrictions(index);
    }
    let route = match query.run()? {
        Outcome::Route(route) => route,
        Outcome::NoRoute { reason } => bail!("no route from {from} to {to}: {reason}"),
    };

    if json {
        print_json(&RouteOutput {
            from,
            to,
            weight: route.weight,
            path: &route.vertices,
        })?;
    } else {
        println!("weight: {}", route.weight);
        let path: Vec<String> = route.vertices.iter().map(|v| v.to_string()).collect();
        println!("path: {}", path.join(" "));
    }
    Ok(())
}

fn matrix(
    hierarchy_path: &Path,
    sources: &str,
    targets: &str,
    restrictions: Option<&Path>,
) -> Result<()> {
    let hierarchy = load_hierarchy(hierarchy_path)?;
    let index = load_restrictions(restrictions)?;
    let sources = parse_vertex_list(sources)?;
    let targets = parse_vertex_list(targets)?;

    let provider = index.as_ref().map(|i| i as &dyn RestrictionProvider);
    let table = distance_matrix(&hierarchy, provider, &sources, &targets)?;
    print_json(&table)
}

fn validate(
    graph_path: &Path,
    hierarchy_path: &Path,
    restrictions: Option<&Path>,
    queries: usize,
    seed: u64,
) -> Result<()> {
    let base = read_edge_list(graph_path)?;
    let hierarchy = load_hierarchy(hierarchy_path)?;
    let index = load_restrictions(restrictions)?;
    let provider = index.as_ref().map(|i| i as &dyn RestrictionProvider);

    let shortcuts = verify_shortcuts(&hierarchy)?;
    let result = validate_hierarchy(&base, &hierarchy, provider, queries, seed)?;

    #[derive(Serialize)]
    struct Report<'a> {
        shortcuts: &'a butterfly_routing::validate::ShortcutCheck,
        queries: &'a butterfly_routing::validate::ValidationResult,
    }
    print_json(&Report {
        shortcuts: &shortcuts,
        queries: &result,
    })?;

    if !shortcuts.mismatches.is_empty() || !result.is_ok() {
        bail!(
            "validation failed: {} shortcut mismatches, {} incorrect queries",
            shortcuts.mismatches.len(),
            result.incorrect
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct Inspection {
    vertices: u32,
    edges: u32,
    shortcuts: u32,
    edge_based: bool,
}

fn inspect(hierarchy_path: &Path) -> Result<()> {
    let hierarchy = load_hierarchy(hierarchy_path)?;
    print_json(&Inspection {
        vertices: hierarchy.vertex_count(),
        edges: hierarchy.edge_count(),
        shortcuts: hierarchy.shortcut_count()?,
        edge_based: hierarchy.is_edge_based(),
    })
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use point_core::text::char_len;
use point_core::{GraphStore, Point, ThreadConfig};
use thread_tree::{resolve_root_order, ExpansionState, NodeType, TreeNode, TreeView};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "thread-cli")]
#[command(about = "Inspect branching conversation threads stored as JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the flattened display tree
    Tree {
        /// JSON file holding an array of points
        file: PathBuf,
        /// Top-level point ids, in order (defaults to every root point)
        #[arg(long = "root")]
        roots: Vec<String>,
        /// Node ids to collapse
        #[arg(long)]
        collapse: Vec<String>,
        /// Start with every node collapsed
        #[arg(long)]
        collapsed: bool,
        /// Maximum characters of text shown per node
        #[arg(long, default_value_t = 60)]
        width: usize,
    },
    /// List the shards of a point
    Shards {
        /// JSON file holding an array of points
        file: PathBuf,
        point_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ThreadConfig::load();

    match cli.command {
        Commands::Tree {
            file,
            roots,
            collapse,
            collapsed,
            width,
        } => {
            let store = load_store(&file)?;
            let root_order = if roots.is_empty() {
                store.roots().into_iter().cloned().collect()
            } else {
                resolve_root_order(&store, &roots)
            };

            let mut expansion = ExpansionState::new(config.default_expanded && !collapsed);
            for id in &collapse {
                expansion.set(id.clone(), false);
            }
            let mut view = TreeView::new(expansion);
            let flat = view.rebuild(&store, &root_order);
            if flat.is_empty() {
                println!("{}", "(empty tree)".dimmed());
            }
            for node in &flat {
                println!("{}", render_row(node, width));
            }
        }
        Commands::Shards { file, point_id } => {
            let store = load_store(&file)?;
            let Some(point) = store.get(&point_id) else {
                bail!("point {point_id} not found in {}", file.display());
            };
            let len = point.response_len();
            println!("{} ({} chars, {} shards)", point.id.bold(), len, point.shards.len());
            for shard in &point.shards {
                let status = if shard.anchor.fits(len) {
                    "valid".green()
                } else {
                    "invalid".red()
                };
                println!(
                    "  {} [{}..{}] {} {:?} -> {}",
                    shard.shard_id,
                    shard.anchor.start_position,
                    shard.anchor.end_position,
                    status,
                    shard.anchor.selected_text,
                    shard.children.join(", ")
                );
            }
        }
    }

    Ok(())
}

fn load_store(path: &Path) -> anyhow::Result<GraphStore> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let points: Vec<Point> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse points from {}", path.display()))?;
    tracing::debug!(count = points.len(), "Loaded points");
    Ok(points.into_iter().collect())
}

fn render_row(node: &TreeNode, width: usize) -> String {
    let marker = match (node.has_children, node.is_expanded) {
        (true, true) => "v",
        (true, false) => ">",
        (false, _) => " ",
    };
    let label = match node.node_type {
        NodeType::Exchange => "exchange".blue(),
        NodeType::Shard => "shard".magenta(),
        NodeType::ShardResponse => "segment".cyan(),
    };
    let text = node
        .prompt_content
        .as_deref()
        .map(|prompt| format!("Q: {prompt}"))
        .into_iter()
        .chain(node.response_content.as_deref().map(|r| format!("A: {r}")))
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "{}{} [{}] {} {}",
        "  ".repeat(node.level),
        marker,
        label,
        node.id.bold(),
        preview(&text, width).dimmed()
    )
}

fn preview(text: &str, width: usize) -> String {
    let single_line = text.replace('\n', " ");
    if char_len(&single_line) <= width {
        return single_line;
    }
    let cut: String = single_line.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_characters() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ünïcödé text here", 8), "ünïcö...");
        assert_eq!(preview("a\nb", 10), "a b");
    }
}

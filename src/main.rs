use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use typetree_history::corpus;
use typetree_history::logging::{self, LogFormat};
use typetree_history::packager;
use typetree_history::{BuildConfig, Error, Mutation, SchemaNode, UnionTree, VersionKey, version_key};

#[derive(Debug, Parser)]
#[command(name = "typetree-history")]
#[command(about = "Fold per-version Unity type tree dumps into one versioned schema", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fold a dump directory and write the packaged artifact
    Build {
        /// Directory of `<version>.<ext>` dump files
        #[arg(long)]
        dumps: PathBuf,
        /// Global string blob shared by all dumps
        #[arg(long)]
        strings: PathBuf,
        /// Artifact output path
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "dat")]
        extension: String,
    },
    /// Print the contents of a packaged artifact
    Inspect {
        artifact: PathBuf,
        /// Only print this class
        #[arg(long)]
        class: Option<String>,
        /// Show field presence and alignment at this version label
        #[arg(long)]
        at: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format.into(), cli.verbose);

    let result = match cli.command {
        Commands::Build {
            dumps,
            strings,
            out,
            extension,
        } => {
            let config = BuildConfig::new(dumps, strings)
                .with_output(out)
                .with_extension(extension);
            corpus::run(&config).map(|_| ())
        }
        Commands::Inspect {
            artifact,
            class,
            at,
        } => inspect(&artifact, class.as_deref(), at.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn inspect(artifact: &Path, class: Option<&str>, at: Option<&str>) -> Result<(), Error> {
    let bytes = fs::read(artifact)?;
    let union = packager::unpack_bytes(&bytes).map_err(|source| Error::Decode {
        label: artifact.display().to_string(),
        source,
    })?;
    let at = at.map(version_key).transpose()?;

    print_union(&union, class, at);
    Ok(())
}

fn print_union(union: &UnionTree, only: Option<&str>, at: Option<VersionKey>) {
    for (name, root) in union.classes() {
        if only.is_some_and(|c| c != name) {
            continue;
        }
        println!("\nClass {}", name);
        print_node(root, None, 1, at);
    }
}

fn print_node(node: &SchemaNode, parent: Option<&SchemaNode>, depth: usize, at: Option<VersionKey>) {
    let indent = "  ".repeat(depth);

    let state = match (parent, at) {
        (Some(parent), Some(version)) => {
            let state = parent.events.state_at(&node.name, version);
            format!(
                " [{}{}]",
                if state.present { "present" } else { "absent" },
                if state.aligned { ", aligned" } else { "" }
            )
        }
        _ => String::new(),
    };
    let removed = if node.removed { " (removed)" } else { "" };
    println!("{}{} {}{}{}", indent, node.type_name, node.name, removed, state);

    if at.is_none() {
        for event in &node.events {
            let detail = match &event.mutation {
                Mutation::FieldAdded { subtree, index } => {
                    format!("add {} at {}", subtree.name, index)
                }
                Mutation::FieldRemoved { name } => format!("remove {}", name),
                Mutation::AlignmentChanged { name, aligned } => {
                    format!("align {} = {}", name, aligned)
                }
                Mutation::Retyped { name, type_name } => format!("retype {} -> {}", name, type_name),
                Mutation::Reordered { name, index } => format!("move {} to {}", name, index),
            };
            println!("{}  @{} {}", indent, event.version, detail);
        }
    }

    for child in &node.children {
        print_node(child, Some(node), depth + 1, at);
    }
}

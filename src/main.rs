//! Compstore CLI - Command-line interface for the component store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use compstore::config::{self, CompstoreConfig};
use compstore::ui::{self, Icons};
use compstore::{Attributes, Component, ComponentKind, ComponentPath, ComponentStore, NewComponent, StoreConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "compstore")]
#[command(version)]
#[command(about = "Component Store - hierarchical inventory of beamline components")]
#[command(long_about = r#"
Compstore keeps groups, quadrupoles and crystals in a SQLite database,
organized as a tree where each component is addressed by its name path.

Example usage:
  compstore init
  compstore add group G2
  compstore add quadrupole Q5 --attr prop1=5.1 --parent G2
  compstore children G2
  compstore tree
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Store every attribute in one wide table instead of one table per kind
        #[arg(long)]
        wide: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create and save a component
    Add {
        /// Component kind (group, quadrupole, crystal)
        kind: String,

        /// Component name
        name: String,

        /// Kind-specific attribute, as name=value (repeatable)
        #[arg(short, long = "attr", value_parser = parse_attr)]
        attrs: Vec<(String, f64)>,

        /// Path of the parent component
        #[arg(short, long)]
        parent: Option<String>,

        /// Associated data file
        #[arg(long)]
        datafile: Option<String>,
    },

    /// List saved components, optionally of one kind
    List {
        /// Filter by component kind
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Find saved components by exact name
    Find {
        name: String,
    },

    /// Show the direct children of a component
    Children {
        /// Path of the component
        path: String,
    },

    /// Move a component under a new parent
    Attach {
        /// Path of the component to move
        child: String,

        /// Path of the new parent
        parent: String,
    },

    /// Make a component a root
    Detach {
        /// Path of the component
        path: String,
    },

    /// Print the hierarchy, or the subtree below one component
    Tree {
        /// Path of the subtree root (defaults to every root)
        path: Option<String>,
    },

    /// Show statistics about the store
    Stats,
}

fn parse_attr(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    Ok((key.trim().to_string(), value))
}

/// Database path and store options after merging CLI flags over the config file
struct Settings {
    database: PathBuf,
    store: StoreConfig,
}

fn settings(cli: &Cli) -> anyhow::Result<Settings> {
    let file = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = cli
        .database
        .clone()
        .or_else(|| file.database.map(PathBuf::from))
        .unwrap_or_else(config::default_database_path);
    Ok(Settings {
        database,
        store: file.store,
    })
}

fn open_store(settings: &Settings) -> anyhow::Result<ComponentStore> {
    config::ensure_db_dir(&settings.database)?;
    tracing::debug!("Opening {:?} ({} layout)", settings.database, settings.store.layout());
    Ok(ComponentStore::open(&settings.database, settings.store)?)
}

fn resolve(store: &ComponentStore, path: &str) -> anyhow::Result<Component> {
    let path = ComponentPath::parse(path)?;
    Ok(store.resolve_path(&path)?)
}

fn print_components(components: &[Component], json: bool, empty: &str) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(components)?);
    } else if components.is_empty() {
        println!("∅ {}", empty);
    } else {
        println!("{}", ui::component_table(components));
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init { wide, force } => {
            let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
            let database = cli.database.clone().unwrap_or_else(config::default_database_path);
            let file = CompstoreConfig {
                database: Some(database.to_string_lossy().to_string()),
                store: if *wide { StoreConfig::wide() } else { StoreConfig::separate() },
            };
            config::write_config(&config_path, &file, *force)?;

            let settings = Settings {
                database,
                store: file.store,
            };
            let store = open_store(&settings)?;

            ui::header("Initialized component store");
            ui::info("Config", &config_path.display().to_string());
            ui::info("Database", &settings.database.display().to_string());
            ui::info("Layout", store.layout().as_str());
        }

        Commands::Add { kind, name, attrs, parent, datafile } => {
            let settings = settings(&cli)?;
            let mut store = open_store(&settings)?;

            let kind: ComponentKind = kind.parse()?;
            let attributes = Attributes::from_pairs(kind, attrs)?;
            let mut draft = NewComponent::new(kind, name.clone(), attributes);
            if let Some(parent) = parent {
                draft = draft.with_parent(resolve(&store, parent)?.id);
            }
            if let Some(datafile) = datafile {
                draft = draft.with_datafile(datafile.clone());
            }

            let component = store.create(draft)?;
            store.save(&[component.id])?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&component)?);
            } else {
                let path = store.path_of(component.id)?;
                ui::success(&format!("Added {} {} ({})", component.kind(), path, component.id));
            }
        }

        Commands::List { kind } => {
            let settings = settings(&cli)?;
            let store = open_store(&settings)?;

            let components = match kind {
                Some(k) => store.query_by_type(k.parse()?)?,
                None => {
                    let mut all = Vec::new();
                    for kind in ComponentKind::all() {
                        all.extend(store.query_by_type(*kind)?);
                    }
                    all.sort_by_key(|c| c.id);
                    all
                }
            };
            print_components(&components, cli.json, "No components found.")?;
        }

        Commands::Find { name } => {
            let settings = settings(&cli)?;
            let store = open_store(&settings)?;

            if !cli.json {
                println!("{} Finding components named '{}'...", Icons::SEARCH, name);
            }
            let found = store.query_by_name(name)?;
            print_components(&found, cli.json, "No components found.")?;
        }

        Commands::Children { path } => {
            let settings = settings(&cli)?;
            let store = open_store(&settings)?;

            let parent = resolve(&store, path)?;
            let children: Vec<Component> = store.get_children(parent.id)?.into_values().collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&children)?);
            } else {
                ui::section(&format!(" {} ", path));
                if children.is_empty() {
                    println!("∅ No children.");
                }
                for child in &children {
                    ui::component_line(child);
                }
            }
        }

        Commands::Attach { child, parent } => {
            let settings = settings(&cli)?;
            let mut store = open_store(&settings)?;

            let child = resolve(&store, child)?;
            let parent = resolve(&store, parent)?;
            store.attach_child(parent.id, child.id)?;
            store.save_all()?;

            let new_path = store.path_of(child.id)?;
            ui::success(&format!("{} Moved {} to {}", Icons::LINK, child.name, new_path));
        }

        Commands::Detach { path } => {
            let settings = settings(&cli)?;
            let mut store = open_store(&settings)?;

            let component = resolve(&store, path)?;
            store.detach(component.id)?;
            store.save_all()?;
            ui::success(&format!("{} is now a root component", component.name));
        }

        Commands::Tree { path } => {
            let settings = settings(&cli)?;
            let store = open_store(&settings)?;
            let tree = store.load_tree()?;
            let top = match path {
                Some(p) => Some(resolve(&store, p)?),
                None => None,
            };

            if cli.json {
                let walked = match &top {
                    Some(c) => {
                        let mut nodes = vec![(0, c)];
                        nodes.extend(tree.descendants(c.id));
                        nodes
                    }
                    None => tree.walk(),
                };
                let nodes: Vec<serde_json::Value> = walked
                    .into_iter()
                    .map(|(depth, c)| serde_json::json!({ "depth": depth, "component": c }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else if tree.is_empty() {
                println!("∅ The store is empty.");
            } else {
                println!("{} Component tree ({})", Icons::TREE, display_path(&settings.database));
                match &top {
                    Some(c) => print!("{}", tree.render_from(c.id).unwrap_or_default()),
                    None => print!("{}", tree.render()),
                }
            }
        }

        Commands::Stats => {
            let settings = settings(&cli)?;
            let store = open_store(&settings)?;
            let stats = store.stats()?;

            if cli.json {
                let data = serde_json::json!({
                    "layout": stats.layout,
                    "groups": stats.groups,
                    "quadrupoles": stats.quadrupoles,
                    "crystals": stats.crystals,
                    "total": stats.total(),
                    "pending": stats.pending,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Compstore Statistics ({})", Icons::STATS, display_path(&settings.database));
                let rows = [
                    ("Layout", stats.layout.to_string()),
                    ("Groups", stats.groups.to_string()),
                    ("Quadrupoles", stats.quadrupoles.to_string()),
                    ("Crystals", stats.crystals.to_string()),
                    ("Total", stats.total().to_string()),
                    ("Pending", stats.pending.to_string()),
                ];
                let rows: Vec<(&str, &str)> = rows.iter().map(|(k, v)| (*k, v.as_str())).collect();
                println!("{}", ui::stats_table(&rows));
            }
        }
    }

    Ok(())
}

fn display_path(path: &Path) -> String {
    format!("{} {}", Icons::DATABASE, path.display())
}

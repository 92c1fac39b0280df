use anyhow::{Context, Result, bail};
use clap::Parser;
use kubeview::Dashboard;
use kubeview::backend::{CatalogSource, ClusterCatalog, FixtureCatalog, HttpCatalog};
use kubeview::config::{DetailPolicy, ViewerConfig};
use kubeview::inventory::detail::DetailOutcome;
use kubeview::inventory::taxonomy::Taxonomy;
use kubeview::inventory::{DetailCacheEntry, ResourceSummary, ResourceTypeName};
use kubeview::logging::init_logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Inventory backend base URL (default: $KUBEVIEW_BASE_URL or http://localhost:8080)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Read the cluster directly through the current kube config
    #[arg(long, conflicts_with_all = ["base_url", "fixture"])]
    direct: bool,

    /// Serve the inventory from a JSON fixture file
    #[arg(long, value_name = "FILE", conflicts_with = "base_url")]
    fixture: Option<PathBuf>,

    /// Resource type to toggle on (repeatable)
    #[arg(short, long = "select", value_name = "TYPE")]
    select: Vec<String>,

    /// Case-insensitive name filter for the grid
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Open the detail of one resource (repeatable)
    #[arg(short, long = "open", value_name = "TYPE/NAME")]
    open: Vec<String>,

    /// Print the full detail document as JSON
    #[arg(long)]
    raw: bool,

    /// Keep a type's last listing when its fetch fails
    #[arg(long)]
    retain_on_failure: bool,

    /// Re-fetch details when a cached resource is opened again
    #[arg(long)]
    refresh_details: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn viewer_config(&self) -> ViewerConfig {
        let mut config = ViewerConfig::from_env().with_retain_on_failure(self.retain_on_failure);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if self.refresh_details {
            config = config.with_detail_policy(DetailPolicy::RefreshOnReopen);
        }
        config
    }

    async fn source(&self, config: &ViewerConfig) -> Result<Arc<dyn CatalogSource>> {
        if self.direct {
            let catalog = ClusterCatalog::new(&config.user_agent)
                .await
                .context("could not connect to the cluster")?;
            return Ok(Arc::new(catalog));
        }
        if let Some(path) = &self.fixture {
            let catalog = FixtureCatalog::from_path(path)
                .with_context(|| format!("could not load fixture {}", path.display()))?;
            return Ok(Arc::new(catalog));
        }
        Ok(Arc::new(HttpCatalog::new(config)?))
    }
}

fn print_taxonomy(taxonomy: &Taxonomy) {
    let names = |types: &[ResourceTypeName]| {
        types
            .iter()
            .map(ResourceTypeName::display_name)
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Quick access: {}", names(&taxonomy.quick_access));
    for group in &taxonomy.groups {
        println!("{}: {}", group.name, names(&group.members));
    }
}

fn print_grid(rows: &[ResourceSummary]) {
    let type_width = rows
        .iter()
        .map(|row| row.resource_type.as_str().len())
        .chain(std::iter::once("TYPE".len()))
        .max()
        .unwrap_or_default();
    let namespace_width = rows
        .iter()
        .map(|row| row.namespace.len())
        .chain(std::iter::once("NAMESPACE".len()))
        .max()
        .unwrap_or_default();

    println!("{:<type_width$}  {:<namespace_width$}  NAME", "TYPE", "NAMESPACE");
    for row in rows {
        println!(
            "{:<type_width$}  {:<namespace_width$}  {}",
            row.resource_type, row.namespace, row.name
        );
    }
}

fn print_detail(entry: &DetailCacheEntry, raw: bool) -> Result<()> {
    println!("{}", entry.id);
    if raw {
        println!("{}", entry.detail.to_pretty_json()?);
        return Ok(());
    }
    println!("  kind: {}", entry.detail.kind.as_deref().unwrap_or("-"));
    println!("  apiVersion: {}", entry.detail.api_version.as_deref().unwrap_or("-"));
    let labels = entry.detail.labels();
    if labels.is_empty() {
        println!("  labels: <none>");
    } else {
        println!("  labels:");
        for (key, value) in labels {
            println!("    {key}={value}");
        }
    }
    Ok(())
}

fn parse_target(target: &str) -> Result<ResourceSummary> {
    match target.split_once('/') {
        Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
            Ok(ResourceSummary::new(ResourceTypeName::new(resource_type), name))
        }
        _ => bail!("--open expects TYPE/NAME, got {target:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = args.viewer_config();
    debug!("Starting with {:?}", config);
    let dashboard = Dashboard::new(args.source(&config).await?, &config);

    let taxonomy = dashboard
        .load_catalog()
        .await
        .context("failed to load the resource catalog")?;
    print_taxonomy(&taxonomy);

    for resource_type in &args.select {
        let outcome = dashboard.toggle(resource_type.as_str()).await;
        if let Some(aggregate) = outcome.aggregate() {
            for failed in aggregate.failed_types() {
                eprintln!("warning: could not list {failed}");
            }
        }
    }

    println!();
    print_grid(&dashboard.set_filter(args.filter.clone()).await);

    for target in &args.open {
        let summary = parse_target(target)?;
        println!();
        match dashboard.open(&summary).await {
            DetailOutcome::Opened(entry) => print_detail(&entry, args.raw)?,
            DetailOutcome::Closed => println!("{} closed", summary.id),
            DetailOutcome::Failed(e) => eprintln!("error: could not load {}: {e}", summary.id),
            DetailOutcome::Superseded => {}
        }
    }

    Ok(())
}

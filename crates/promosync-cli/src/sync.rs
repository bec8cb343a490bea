//! `sync` command: crawl each selected source, then reconcile it with the store.
//!
//! Sources run one after another. A source that fails is recorded in the run
//! summary and skipped; it does not abort the remaining sources.

use std::path::Path;

use promosync_core::{AppConfig, CampaignWindow, SourceConfig, SourcesFile};
use promosync_scraper::{crawl, PromoClient, SourceKind, SourceSpec};
use promosync_sync::{sync_partition, Reconciler, SnapshotStore};

use crate::dump::dump_records;
use crate::summary::{RunSummary, SourceSummary};

/// A registry entry paired with the scraper that implements it.
#[derive(Debug, Clone)]
pub(crate) struct SelectedSource {
    pub config: SourceConfig,
    pub spec: SourceSpec,
}

/// Every registered source must name a scraper this binary knows.
pub(crate) fn ensure_known_sources(sources: &SourcesFile) -> anyhow::Result<()> {
    let unknown: Vec<&str> = sources
        .sources
        .iter()
        .filter(|s| SourceKind::from_name(s.name.trim()).is_none())
        .map(|s| s.name.as_str())
        .collect();
    if !unknown.is_empty() {
        let known: Vec<&str> = SourceKind::ALL.iter().map(|k| k.name()).collect();
        anyhow::bail!(
            "no scraper for source(s) [{}]; known sources are [{}]",
            unknown.join(", "),
            known.join(", ")
        );
    }
    Ok(())
}

/// Resolves `selector` (`all` or a source name) against the registry.
///
/// `all` picks every enabled source in registry order. Naming a disabled
/// source runs it anyway.
pub(crate) fn select_sources(
    sources: &SourcesFile,
    selector: &str,
) -> anyhow::Result<Vec<SelectedSource>> {
    ensure_known_sources(sources)?;

    let chosen: Vec<&SourceConfig> = if selector.eq_ignore_ascii_case("all") {
        sources.enabled().collect()
    } else {
        let source = sources
            .find(selector)
            .ok_or_else(|| anyhow::anyhow!("source '{selector}' is not registered"))?;
        if !source.enabled {
            tracing::info!(source = %source.name, "running disabled source by explicit request");
        }
        vec![source]
    };

    chosen
        .into_iter()
        .map(|config| {
            let kind = SourceKind::from_name(config.name.trim())
                .ok_or_else(|| anyhow::anyhow!("no scraper for source '{}'", config.name))?;
            Ok(SelectedSource {
                spec: kind.spec().with_max_pages(config.max_pages),
                config: config.clone(),
            })
        })
        .collect()
}

/// Crawls and syncs every selected source in sequence.
pub(crate) async fn run_sync<S>(
    store: &S,
    client: &PromoClient,
    reconciler: &Reconciler,
    data_dir: Option<&Path>,
    sources: &[SelectedSource],
    window: CampaignWindow,
    dry_run: bool,
) -> RunSummary
where
    S: SnapshotStore + ?Sized,
{
    let mut summary = RunSummary::default();

    for source in sources {
        let name = source.config.name.as_str();
        let mode = source.config.mode;
        tracing::info!(source = name, %mode, dry_run, "source started");

        let report = crawl(client, &source.spec, window).await;
        if report.failed_outright() {
            let error = report.first_error().unwrap_or("crawl failed").to_string();
            tracing::error!(source = name, error = %error, "crawl failed, source skipped");
            summary.record(name, SourceSummary::failed(mode, error));
            continue;
        }
        if let Some(error) = report.first_error() {
            tracing::warn!(source = name, error, "crawl incomplete, syncing partial result");
        }

        if let Some(dir) = data_dir {
            match dump_records(dir, name, &report.records) {
                Ok(path) => tracing::info!(source = name, path = %path.display(), "crawl dump written"),
                Err(e) => tracing::warn!(source = name, error = %e, "crawl dump failed"),
            }
        }

        match sync_partition(
            store,
            reconciler,
            &source.config.partition,
            mode,
            &report.records,
            dry_run,
        )
        .await
        {
            Ok(outcome) => {
                tracing::info!(source = name, ?outcome, "source finished");
                summary.record(name, SourceSummary::from_outcome(mode, outcome));
            }
            Err(e) => {
                tracing::error!(source = name, error = %e, "sync failed");
                summary.record(name, SourceSummary::failed(mode, e.to_string()));
            }
        }
    }

    summary
}

/// Entry point for `promosync sync`: wires config, store and client together,
/// runs the sources, and emits the summary.
pub(crate) async fn run_sync_command(
    config: &AppConfig,
    selector: &str,
    dry_run: bool,
    summary_path: Option<&Path>,
) -> anyhow::Result<RunSummary> {
    let registry = promosync_core::load_sources(&config.sources_path)?;
    let sources = select_sources(&registry, selector)?;
    if sources.is_empty() {
        anyhow::bail!("no enabled sources match '{selector}'");
    }

    let pool = promosync_db::connect_from_config(config).await?;
    let store = promosync_db::PgSnapshotStore::new(pool);
    let client = PromoClient::from_config(config)?;
    let reconciler = Reconciler::from_config(config);

    let summary = run_sync(
        &store,
        &client,
        &reconciler,
        config.data_dir.as_deref(),
        &sources,
        CampaignWindow::current(),
        dry_run,
    )
    .await;

    summary.emit(summary_path)?;
    Ok(summary)
}

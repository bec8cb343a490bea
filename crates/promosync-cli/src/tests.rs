use super::*;

use std::time::Duration;

use chrono::NaiveDate;
use promosync_core::sources::parse_sources;
use promosync_core::{CampaignWindow, SyncMode, SyncStats};
use promosync_scraper::{PromoClient, TransportSettings};
use promosync_sync::{MemoryStore, Reconciler};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::summary::{RunSummary, SourceStatus, SourceSummary};
use crate::sync::{run_sync, select_sources, SelectedSource};

const REGISTRY: &str = r"
sources:
  - name: cu
    partition: CU
    mode: diff
    max_pages: 5
  - name: seven-eleven
    partition: SevenEleven
    mode: replace_month
    enabled: false
";

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["promosync", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["promosync", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_command() {
    let cli = Cli::try_parse_from(["promosync", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["promosync"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn sync_defaults_to_all_sources() {
    let cli = Cli::try_parse_from(["promosync", "sync"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            ref selector,
            dry_run: false,
            summary_path: None,
        }) if selector == "all"
    ));
}

#[test]
fn sync_accepts_selector_dry_run_and_summary_path() {
    let cli = Cli::try_parse_from([
        "promosync",
        "sync",
        "cu",
        "--dry-run",
        "--summary-path",
        "/tmp/summary.json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            ref selector,
            dry_run: true,
            summary_path: Some(ref p),
        }) if selector == "cu" && p == std::path::Path::new("/tmp/summary.json")
    ));
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["promosync", "collect"]).is_err());
}

// ---------------------------------------------------------------------------
// Source selection
// ---------------------------------------------------------------------------

#[test]
fn all_selects_enabled_sources_only() {
    let registry = parse_sources(REGISTRY).unwrap();
    let selected = select_sources(&registry, "all").unwrap();

    let names: Vec<&str> = selected.iter().map(|s| s.config.name.as_str()).collect();
    assert_eq!(names, vec!["cu"]);
    assert_eq!(selected[0].spec.max_pages, 5);
}

#[test]
fn named_disabled_source_still_runs() {
    let registry = parse_sources(REGISTRY).unwrap();
    let selected = select_sources(&registry, "Seven-Eleven").unwrap();

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].config.mode, SyncMode::ReplaceMonth);
    assert_eq!(selected[0].spec.max_pages, 30);
}

#[test]
fn unregistered_selector_is_an_error() {
    let registry = parse_sources(REGISTRY).unwrap();
    let err = select_sources(&registry, "emart24").unwrap_err();
    assert!(err.to_string().contains("not registered"));
}

#[test]
fn registry_entry_without_scraper_is_an_error() {
    let registry = parse_sources(
        r"
sources:
  - name: gs25
    partition: GS25
",
    )
    .unwrap();
    let err = select_sources(&registry, "all").unwrap_err();
    assert!(err.to_string().contains("gs25"));
}

#[test]
fn seed_partitions_are_distinct_and_include_disabled_sources() {
    let registry = parse_sources(
        r"
sources:
  - name: cu
    partition: CU
  - name: seven-eleven
    partition: SevenEleven
    enabled: false
  - name: cu-backup
    partition: CU
",
    )
    .unwrap();
    assert_eq!(db::partition_names(&registry), vec!["CU", "SevenEleven"]);
}

// ---------------------------------------------------------------------------
// Summary and dump
// ---------------------------------------------------------------------------

#[test]
fn summary_json_has_per_source_entries() {
    let mut summary = RunSummary::default();
    summary.record(
        "cu",
        SourceSummary::from_outcome(
            SyncMode::Diff,
            promosync_sync::SyncOutcome::Diff(SyncStats {
                new: 1,
                updated: 2,
                deleted: 3,
                unchanged: 4,
                total: 7,
            }),
        ),
    );
    summary.record(
        "seven-eleven",
        SourceSummary::failed(SyncMode::ReplaceMonth, "connection failed"),
    );

    let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "sources": {
                "cu": {
                    "status": "ok",
                    "mode": "diff",
                    "stats": {"new": 1, "updated": 2, "deleted": 3, "unchanged": 4, "total": 7}
                },
                "seven-eleven": {
                    "status": "failed",
                    "mode": "replace_month",
                    "error": "connection failed"
                }
            }
        })
    );
    assert_eq!(summary.failed_sources(), vec!["seven-eleven"]);
}

#[test]
fn replace_month_summary_reports_inserted() {
    let entry = SourceSummary::from_outcome(
        SyncMode::ReplaceMonth,
        promosync_sync::SyncOutcome::ReplaceMonth { inserted: 12 },
    );
    assert_eq!(entry.status, SourceStatus::Ok);
    assert_eq!(entry.inserted, Some(12));
    assert!(entry.stats.is_none());
}

#[test]
fn dump_file_names_are_slugged() {
    assert_eq!(dump::dump_file_name("cu"), "cu_products.json");
    assert_eq!(
        dump::dump_file_name("Seven-Eleven"),
        "seven_eleven_products.json"
    );
}

#[test]
fn dump_writes_pretty_json_records() {
    let dir = std::env::temp_dir().join(format!("promosync-dump-{}", uuid::Uuid::new_v4()));
    let path = dump::dump_records(&dir, "cu", &[]).unwrap();

    assert_eq!(path, dir.join("cu_products.json"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

fn test_client() -> PromoClient {
    PromoClient::new(&TransportSettings {
        timeout_secs: 5,
        user_agent: "promosync-test/0.1".to_owned(),
        max_attempts: 1,
        backoff_base_secs: 0,
        crawl_delay: Duration::ZERO,
    })
    .expect("failed to build test PromoClient")
}

fn window() -> CampaignWindow {
    CampaignWindow::for_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
}

fn cu_page(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|t| {
            format!(
                r#"<li class="prod_list"><div class="prod_img"><img src="/img/{t}.jpg"></div><div class="name"><p>{t}</p></div><div class="price"><strong>1,000</strong>원</div></li>"#
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

async fn cu_server(first_page: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event/plusAjax.do"))
        .and(query_param("searchCondition", "23"))
        .and(query_param("pageIndex", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cu_page(first_page)))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/event/plusAjax.do"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .with_priority(10)
        .mount(&server)
        .await;
    server
}

fn cu_source(base_url: &str) -> SelectedSource {
    let registry = parse_sources(REGISTRY).unwrap();
    let mut selected = select_sources(&registry, "cu").unwrap();
    let mut source = selected.remove(0);
    source.spec = source.spec.with_base_url(base_url);
    source
}

#[tokio::test]
async fn sync_run_reconciles_crawl_into_store() {
    let server = cu_server(&["콜라", "사이다"]).await;
    let store = MemoryStore::new();
    let partition = store.register_partition("CU").await;

    let summary = run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        None,
        &[cu_source(&server.uri())],
        window(),
        false,
    )
    .await;

    let entry = &summary.sources["cu"];
    assert_eq!(entry.status, SourceStatus::Ok);
    assert_eq!(entry.stats.map(|s| s.new), Some(2));
    assert_eq!(store.rows(partition).await.len(), 2);
}

#[tokio::test]
async fn dry_run_leaves_store_untouched() {
    let server = cu_server(&["콜라"]).await;
    let store = MemoryStore::new();
    store.register_partition("CU").await;

    let summary = run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        None,
        &[cu_source(&server.uri())],
        window(),
        true,
    )
    .await;

    assert_eq!(summary.sources["cu"].stats.map(|s| s.new), Some(1));
    assert!(store.mutations().await.is_empty());
}

#[tokio::test]
async fn unreachable_source_is_reported_failed_without_store_calls() {
    let store = MemoryStore::new();
    store.register_partition("CU").await;

    let summary = run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        None,
        &[cu_source("http://127.0.0.1:1")],
        window(),
        false,
    )
    .await;

    let entry = &summary.sources["cu"];
    assert_eq!(entry.status, SourceStatus::Failed);
    assert!(entry.error.is_some());
    assert!(store.mutations().await.is_empty());
}

#[tokio::test]
async fn unregistered_partition_fails_the_source() {
    let server = cu_server(&["콜라"]).await;
    let store = MemoryStore::new();

    let summary = run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        None,
        &[cu_source(&server.uri())],
        window(),
        false,
    )
    .await;

    let entry = &summary.sources["cu"];
    assert_eq!(entry.status, SourceStatus::Failed);
    assert_eq!(entry.error.as_deref(), Some("partition not found: CU"));
}

#[tokio::test]
async fn crawl_dump_is_written_to_data_dir() {
    let server = cu_server(&["콜라"]).await;
    let store = MemoryStore::new();
    store.register_partition("CU").await;
    let dir = std::env::temp_dir().join(format!("promosync-run-{}", uuid::Uuid::new_v4()));

    run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        Some(&dir),
        &[cu_source(&server.uri())],
        window(),
        true,
    )
    .await;

    let dumped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("cu_products.json")).unwrap())
            .unwrap();
    assert_eq!(dumped[0]["title"], "콜라");
    assert_eq!(dumped[0]["deal_type"], "ONE_PLUS_ONE");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn failed_source_does_not_stop_the_next_one() {
    let server = cu_server(&["콜라", "사이다"]).await;
    let store = MemoryStore::new();
    let partition = store.register_partition("CU").await;

    let mut mirror = cu_source(&server.uri());
    mirror.config.name = "cu-mirror".to_owned();
    let sources = [cu_source("http://127.0.0.1:1"), mirror];

    let summary = run_sync(
        &store,
        &test_client(),
        &Reconciler::default(),
        None,
        &sources,
        window(),
        false,
    )
    .await;

    assert_eq!(summary.sources["cu"].status, SourceStatus::Failed);
    let mirror = &summary.sources["cu-mirror"];
    assert_eq!(mirror.status, SourceStatus::Ok);
    assert_eq!(mirror.stats.map(|s| s.new), Some(2));
    assert_eq!(summary.failed_sources(), vec!["cu"]);
    assert_eq!(store.rows(partition).await.len(), 2);
}

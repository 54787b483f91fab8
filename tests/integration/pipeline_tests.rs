//! Integration tests for the pipeline
//!
//! These tests use wiremock to stand in for the government sites and run
//! whole sources against a SQLite file in a temporary directory.

use missing_persons::config::{Config, DatabaseConfig, FetcherConfig, SourceEntry, SourcesConfig};
use missing_persons::crawler::{build_orchestrators, crawl, run_sources};
use missing_persons::sources::{Croatia, Romania, Source};
use missing_persons::storage::{SourceTables, SqliteStorage, Storage, StoreHandle};
use missing_persons::{fingerprint, ScrapeError};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CROATIA_LISTING: &str = "/nestale-osobe-403/403";
const ROMANIA_LISTING: &str = "/ro/persoane-disparute";

/// Creates a configuration pointing both sources at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    let entry = |base_url: &str| SourceEntry {
        enabled: true,
        base_url: base_url.to_string(),
    };

    Config {
        database: DatabaseConfig {
            path: db_path.to_string(),
        },
        fetcher: FetcherConfig {
            backoff_schedule_ms: vec![1, 1, 1],
            request_timeout_secs: 5,
            ..FetcherConfig::default()
        },
        sources: SourcesConfig {
            croatia: entry(base_url),
            romania: entry(base_url),
        },
        ..Config::default()
    }
}

struct Harness {
    _dir: TempDir,
    config: Config,
    store: StoreHandle,
    base_url: Url,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("missing_persons.db");
        let config = create_test_config(&server.uri(), db_path.to_str().unwrap());
        let store = StoreHandle::new(SqliteStorage::new(&db_path).unwrap());

        Self {
            _dir: dir,
            config,
            store,
            base_url: Url::parse(&server.uri()).unwrap(),
        }
    }

    fn croatia(&self) -> Arc<dyn Source> {
        Arc::new(Croatia::with_letters(
            self.base_url.clone(),
            vec!["a".to_string()],
        ))
    }

    fn romania(&self) -> Arc<dyn Source> {
        Arc::new(Romania::new(self.base_url.clone()))
    }

    async fn run(&self, sources: Vec<Arc<dyn Source>>) -> Vec<missing_persons::crawler::SourceReport> {
        let orchestrators = build_orchestrators(&self.config, &self.store, sources).unwrap();
        run_sources(orchestrators).await
    }

    /// (records, images) for a source
    fn counts(&self, source: &str) -> (u64, u64) {
        let tables = SourceTables::for_source(source).unwrap();
        self.store
            .with(|s| Ok((s.count_records(&tables)?, s.count_images(&tables)?)))
            .unwrap()
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn croatia_list(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<li><a class="osoba-ime" href="{}?osoba_id={}">Person {}</a></li>"#,
                CROATIA_LISTING, id, id
            )
        })
        .collect();
    format!(r#"<html><body><ul class="nestali-list">{}</ul></body></html>"#, items)
}

fn croatia_detail(id: &str, name: &str, born: &str) -> String {
    format!(
        r#"<html><body>
        <div class="menuLeftPhoto"><img src="/UserDocsImages/nestali/{id}.jpg"></div>
        <div class="profile_details_right"><dl>
            <dt>Ime i prezime:</dt><dd>{name}</dd>
            <dt>Godina rođenja:</dt><dd>{born}</dd>
        </dl></div>
        </body></html>"#
    )
}

/// Mounts letter `a` with the given people on page 1 and an empty page 2
async fn mount_croatia_listing(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(CROATIA_LISTING))
        .and(query_param("slovo", "a"))
        .and(query_param("page", "1"))
        .respond_with(html(croatia_list(ids)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(CROATIA_LISTING))
        .and(query_param("slovo", "a"))
        .and(query_param("page", "2"))
        .respond_with(html(croatia_list(&[])))
        .mount(server)
        .await;
}

async fn mount_croatia_detail(server: &MockServer, id: &str, name: &str, born: &str) {
    Mock::given(method("GET"))
        .and(path(CROATIA_LISTING))
        .and(query_param("osoba_id", id))
        .respond_with(html(croatia_detail(id, name, born)))
        .mount(server)
        .await;
}

async fn mount_croatia_image(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/UserDocsImages/nestali/{}.jpg", id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .mount(server)
        .await;
}

async fn mount_romania(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ROMANIA_LISTING))
        .respond_with(html(
            r#"<select id="num_page"><option>1</option><option>2</option></select>"#.to_string(),
        ))
        .mount(server)
        .await;

    for (page, id, name) in [(1, "4411", "POPESCU ION"), (2, "4412", "IONESCU MARIA")] {
        Mock::given(method("GET"))
            .and(path(format!("{}&page={}", ROMANIA_LISTING, page)))
            .respond_with(html(format!(
                r#"<div class="contentList"><div class="boxPoza"><a href="{}/persoana-{}"><img src="t.jpg"></a></div></div>"#,
                ROMANIA_LISTING, id
            )))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/persoana-{}", ROMANIA_LISTING, id)))
            .respond_with(html(format!(
                r#"<div class="pozaDetaliiDisparuti"><img src="/images/disparuti/{id}.jpeg"></div>
                   <div class="descDetaliiDisparuti"><span>{name}</span><span>12.05.1970</span></div>
                   <div class="semnalmenteDisparuti"><p>1.70m</p></div>
                   <div class="detaliiSuplimentareDisparuti"><p>Cluj</p></div>"#
            )))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/images/disparuti/{}.jpeg", id)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_croatia_listing(&server, &["101", "102"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat", "1990.").await;
    mount_croatia_detail(&server, "102", "Ivan Kovač", "1985.").await;
    mount_croatia_image(&server, "101").await;
    mount_croatia_image(&server, "102").await;

    let harness = Harness::new(&server);

    let first = harness.run(vec![harness.croatia()]).await;
    let summary = first[0].result.as_ref().unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.images_stored, 2);
    assert_eq!(harness.counts("croatia"), (2, 2));

    let second = harness.run(vec![harness.croatia()]).await;
    let summary = second[0].result.as_ref().unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.images_stored, 0);
    assert_eq!(harness.counts("croatia"), (2, 2));
}

#[tokio::test]
async fn test_failed_image_is_retried_on_next_run() {
    let server = MockServer::start().await;
    mount_croatia_listing(&server, &["101"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat", "1990.").await;

    // Every attempt of the first run fails
    Mock::given(method("GET"))
        .and(path("/UserDocsImages/nestali/101.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    mount_croatia_image(&server, "101").await;

    let harness = Harness::new(&server);

    let first = harness.run(vec![harness.croatia()]).await;
    let summary = first[0].result.as_ref().unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.images_stored, 0);
    assert_eq!(summary.failures, 0);
    assert_eq!(harness.counts("croatia"), (1, 0));

    let second = harness.run(vec![harness.croatia()]).await;
    let summary = second[0].result.as_ref().unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.images_stored, 1);
    assert_eq!(harness.counts("croatia"), (1, 1));
}

#[tokio::test]
async fn test_changed_content_updates_in_place() {
    let server = MockServer::start().await;
    mount_croatia_listing(&server, &["101"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat", "1990.").await;
    mount_croatia_image(&server, "101").await;

    let harness = Harness::new(&server);
    harness.run(vec![harness.croatia()]).await;

    let tables = SourceTables::for_source("croatia").unwrap();
    let original = harness
        .store
        .with(|s| s.get_record(&tables, 1))
        .unwrap()
        .unwrap();

    server.reset().await;
    mount_croatia_listing(&server, &["101"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat-Babić", "1990.").await;
    mount_croatia_image(&server, "101").await;

    let reports = harness.run(vec![harness.croatia()]).await;
    let summary = reports[0].result.as_ref().unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(harness.counts("croatia"), (1, 1));

    let updated = harness
        .store
        .with(|s| s.get_record(&tables, original.id))
        .unwrap()
        .unwrap();
    assert_eq!(updated.source_item_id, "101");
    assert!(updated.tokens.contains(&"Ana Horvat-Babić".to_string()));
    assert_eq!(updated.fingerprint, fingerprint(&updated.tokens));
    assert_ne!(updated.fingerprint, original.fingerprint);
}

#[tokio::test]
async fn test_sources_run_concurrently_and_independently() {
    let server = MockServer::start().await;
    mount_croatia_listing(&server, &["101"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat", "1990.").await;
    mount_croatia_image(&server, "101").await;
    mount_romania(&server).await;

    let harness = Harness::new(&server);
    let reports = harness.run(vec![harness.croatia(), harness.romania()]).await;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].source, "croatia");
    assert_eq!(reports[1].source, "romania");
    assert!(reports.iter().all(|r| r.is_success()));

    assert_eq!(harness.counts("croatia"), (1, 1));
    assert_eq!(harness.counts("romania"), (2, 2));
}

#[tokio::test]
async fn test_page_discovery_failure_is_fatal_for_that_source_only() {
    let server = MockServer::start().await;
    mount_croatia_listing(&server, &["101"]).await;
    mount_croatia_detail(&server, "101", "Ana Horvat", "1990.").await;
    mount_croatia_image(&server, "101").await;

    Mock::given(method("GET"))
        .and(path(ROMANIA_LISTING))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let reports = harness.run(vec![harness.croatia(), harness.romania()]).await;

    assert!(reports[0].is_success());
    assert!(matches!(reports[1].result, Err(ScrapeError::Fetch(_))));
    assert_eq!(harness.counts("croatia"), (1, 1));
    assert_eq!(harness.counts("romania"), (0, 0));
}

#[tokio::test]
async fn test_crawl_respects_source_selection() {
    let server = MockServer::start().await;
    mount_romania(&server).await;

    let harness = Harness::new(&server);
    let reports = crawl(&harness.config, &harness.store, &["romania".to_string()])
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "romania");
    assert!(reports[0].is_success());
    assert_eq!(harness.counts("romania"), (2, 2));
}

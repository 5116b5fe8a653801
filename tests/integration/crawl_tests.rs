//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the real
//! fetcher, worker pool and checkpoint files through complete stage runs.

use metallum_crawl::checkpoint::CsvCheckpoint;
use metallum_crawl::config::Config;
use metallum_crawl::crawler::{Coordinator, PipelineOutcome, StageKind};
use metallum_crawl::records::{
    AlbumRecord, BandRecord, CompletedItem, FailedAlbum, FailedBucket, FailedDiscography,
    TrackRecord,
};
use metallum_crawl::{CrawlError, ProgressReporter};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Every listing bucket except `C`
const OTHER_BUCKETS: &str = r"^/browse/ajax-letter/l/([ABD-Z]|NBR|~)/json$";

/// Every listing bucket except `A` and `~`
const LETTERS_B_TO_Z: &str = r"^/browse/ajax-letter/l/([B-Z]|NBR)/json$";

const TRACKLIST: &str = r#"<html><body>
<table class="display table_lyrics">
  <tbody>
    <tr class="odd"><td>1.</td><td class="wrapWords">Hammer Smashed Face</td><td align="right">04:03</td><td></td></tr>
    <tr class="even"><td>2.</td><td class="wrapWords">I Cum Blood</td><td align="right">03:41</td><td></td></tr>
    <tr><td colspan="2"></td><td align="right"><strong>07:44</strong></td><td></td></tr>
  </tbody>
</table>
</body></html>"#;

/// Creates a test configuration pointed at the mock server with no waits
fn create_test_config(base_url: &str, dir: &Path, workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.workers = Some(workers);
    config.crawler.max_attempts = 3;
    config.crawler.network_backoff_secs = 0;
    config.crawler.overload_cooldown_secs = 0;
    config.crawler.courtesy_delay_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.upstream.base_url = base_url.to_string();
    config.output.directory = dir.to_path_buf();
    config.progress.enabled = false;
    config
}

fn coordinator(config: Config, cancel: CancellationToken) -> Coordinator {
    Coordinator::new(config, ProgressReporter::disabled(), cancel).unwrap()
}

fn band_row(base_url: &str, id: usize, name: &str) -> Vec<String> {
    vec![
        format!(
            "<a href='{}/bands/{}/{}'>{}</a>",
            base_url,
            name.replace(' ', "_"),
            id,
            name
        ),
        "United States".to_string(),
        "Death Metal".to_string(),
        "<span class=\"active\">Active</span>".to_string(),
    ]
}

fn listing_body(total: usize, rows: Vec<Vec<String>>) -> String {
    serde_json::json!({
        "iTotalRecords": total,
        "iTotalDisplayRecords": total,
        "sEcho": 1,
        "aaData": rows,
    })
    .to_string()
}

async fn mount_empty_buckets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(OTHER_BUCKETS))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(0, vec![])))
        .mount(server)
        .await;
}

fn album(base_url: &str, band_id: usize, album_id: usize) -> AlbumRecord {
    AlbumRecord {
        metallum_band_id: band_id.to_string(),
        band_name: format!("Band {}", band_id),
        metallum_album_id: album_id.to_string(),
        album_name: format!("Album {}", album_id),
        album_type: "Full-length".to_string(),
        year: "1992".to_string(),
        review: String::new(),
        album_url: format!("{}/albums/Band_{}/Album_{}/{}", base_url, band_id, album_id, album_id),
    }
}

#[tokio::test]
async fn test_bucket_pagination_fetches_every_page_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    for offset in [0usize, 500, 1000] {
        let rows = (offset..(offset + 500).min(1200))
            .map(|i| band_row(&base_url, i + 1, &format!("Corpse {}", i + 1)))
            .collect();
        Mock::given(method("GET"))
            .and(path("/browse/ajax-letter/l/C/json"))
            .and(query_param("iDisplayStart", offset.to_string().as_str()))
            .and(query_param("iDisplayLength", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(1200, rows)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    mount_empty_buckets(&mock_server).await;

    let config = create_test_config(&base_url, dir.path(), 4);
    let bands_path = config.output.bands_path();
    let outcome = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    let PipelineOutcome::Completed(reports) = outcome else {
        panic!("bands stage was cancelled");
    };
    assert_eq!(reports[0].seeded, 28);
    assert_eq!(reports[0].completed, 28);

    let bands = CsvCheckpoint::<BandRecord>::new(bands_path).load().unwrap();
    assert_eq!(bands.len(), 1200);
    let ids: HashSet<_> = bands.iter().map(|b| b.metallum_band_id.clone()).collect();
    assert_eq!(ids.len(), 1200);
    assert!(bands.iter().all(|b| b.status == "Active"));
}

#[tokio::test]
async fn test_checkpointed_bucket_is_not_refetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(0, vec![])))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;

    let config = create_test_config(&base_url, dir.path(), 2);
    let bands = CsvCheckpoint::<BandRecord>::new(config.output.bands_path());
    bands
        .write_all(&[BandRecord {
            metallum_band_id: "123".to_string(),
            name: "Cannibal Corpse".to_string(),
            genre: "Brutal Death Metal".to_string(),
            country: "United States".to_string(),
            status: "Active".to_string(),
            url: format!("{}/bands/Cannibal_Corpse/123", base_url),
        }])
        .unwrap();
    CsvCheckpoint::<CompletedItem>::new(config.output.completed_buckets_path())
        .write_all(&[CompletedItem {
            key: "C".to_string(),
        }])
        .unwrap();

    let outcome = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    assert_eq!(outcome.reports()[0].skipped, 1);
    let rows = bands.load().unwrap();
    assert_eq!(
        rows.iter().filter(|b| b.metallum_band_id == "123").count(),
        1
    );
}

#[tokio::test]
async fn test_failing_bucket_spends_its_attempt_budget() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;

    let config = create_test_config(&base_url, dir.path(), 2);
    let failed_path = config.output.failed_buckets_path();
    let bands_path = config.output.bands_path();
    let outcome = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    assert_eq!(outcome.reports()[0].failed, 1);
    let failed = CsvCheckpoint::<FailedBucket>::new(failed_path).load().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].bucket, "C");
    assert!(CsvCheckpoint::<BandRecord>::new(bands_path)
        .load()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_second_page_failure_discards_whole_bucket() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    let rows = (0..500)
        .map(|i| band_row(&base_url, i + 1, &format!("Carcass {}", i + 1)))
        .collect();
    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .and(query_param("iDisplayStart", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(700, rows)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .and(query_param("iDisplayStart", "500"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;

    let config = create_test_config(&base_url, dir.path(), 1);
    let bands_path = config.output.bands_path();
    let failed_path = config.output.failed_buckets_path();
    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    // The first page's rows are not kept without the rest of the bucket
    let bands = CsvCheckpoint::<BandRecord>::new(bands_path).load().unwrap();
    assert!(bands.is_empty());
    let failed = CsvCheckpoint::<FailedBucket>::new(failed_path).load().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].reason.contains("offset 500"));
}

#[tokio::test]
async fn test_bucket_network_errors_stay_within_attempt_budget() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_body(0, vec![]))
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;

    let mut config = create_test_config(&base_url, dir.path(), 4);
    config.crawler.request_timeout_secs = 1;
    let failed_path = config.output.failed_buckets_path();
    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    let failed = CsvCheckpoint::<FailedBucket>::new(failed_path).load().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].bucket, "C");
    assert!(failed[0].reason.contains("after 3 failed requests"));
}

#[tokio::test]
async fn test_overloaded_bucket_is_retried_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;

    let mut config = create_test_config(&base_url, dir.path(), 4);
    config.crawler.overload_status = 503;
    let failed_path = config.output.failed_buckets_path();
    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    let failed = CsvCheckpoint::<FailedBucket>::new(failed_path).load().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].reason.contains("HTTP 503"));
}

#[tokio::test]
async fn test_bucket_resume_follows_completed_buckets_not_band_names() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    // `A` lists a band whose name does not start with an ASCII letter
    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/A/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            1,
            vec![band_row(&base_url, 1, "Ägypten")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/~/json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(LETTERS_B_TO_Z))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(0, vec![])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), 4);
    let completed = CsvCheckpoint::<CompletedItem>::new(config.output.completed_buckets_path());
    let bands = CsvCheckpoint::<BandRecord>::new(config.output.bands_path());
    coordinator(config.clone(), CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    let done: HashSet<_> = completed.load().unwrap().into_iter().map(|c| c.key).collect();
    assert_eq!(done.len(), 27);
    assert!(done.contains("A"));
    assert!(!done.contains("~"));

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/~/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            1,
            vec![band_row(&base_url, 2, "...And Oceans")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/browse/ajax-letter/l/([A-Z]|NBR)/json$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(0, vec![])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let outcome = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Bands])
        .await
        .unwrap();

    assert_eq!(outcome.reports()[0].skipped, 27);
    assert_eq!(outcome.reports()[0].completed, 1);
    assert_eq!(completed.load().unwrap().len(), 28);
    let names: HashSet<_> = bands.load().unwrap().into_iter().map(|b| b.name).collect();
    assert_eq!(
        names,
        HashSet::from(["Ägypten".to_string(), "...And Oceans".to_string()])
    );
}

#[tokio::test]
async fn test_overload_status_is_retried_exactly_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/band/discography/id/7/tab/all"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url, dir.path(), 1);
    config.crawler.overload_status = 503;
    CsvCheckpoint::<BandRecord>::new(config.output.bands_path())
        .write_all(&[BandRecord {
            metallum_band_id: "7".to_string(),
            name: "Autopsy".to_string(),
            genre: "Death/Doom Metal".to_string(),
            country: "United States".to_string(),
            status: "Active".to_string(),
            url: format!("{}/bands/Autopsy/7", base_url),
        }])
        .unwrap();
    let failed_path = config.output.failed_discographies_path();

    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Albums])
        .await
        .unwrap();

    let failed = CsvCheckpoint::<FailedDiscography>::new(failed_path)
        .load()
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].metallum_band_id, "7");
    assert!(failed[0]
        .discography_url
        .ends_with("/band/discography/id/7/tab/all"));
}

#[tokio::test]
async fn test_malformed_album_page_goes_to_failure_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    let good = album(&base_url, 1, 10);
    let bad = album(&base_url, 1, 11);

    Mock::given(method("GET"))
        .and(path("/albums/Band_1/Album_10/10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TRACKLIST))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/Band_1/Album_11/11"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Album removed</body></html>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), 2);
    CsvCheckpoint::<AlbumRecord>::new(config.output.albums_path())
        .write_all(&[good.clone(), bad.clone()])
        .unwrap();
    let tracks_path = config.output.tracks_path();
    let failed_path = config.output.failed_albums_path();

    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Tracks])
        .await
        .unwrap();

    let tracks = CsvCheckpoint::<TrackRecord>::new(tracks_path).load().unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(tracks.iter().all(|t| t.album_url == good.album_url));
    assert_eq!(tracks[0].track_number, "1");
    assert_eq!(tracks[0].track_name, "Hammer Smashed Face");
    assert_eq!(tracks[1].track_length, "03:41");

    let failed = CsvCheckpoint::<FailedAlbum>::new(failed_path).load().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].album_url, bad.album_url);
    assert_eq!(failed[0].album_id, "11");
}

/// Serves a tracklist and cancels the run when the `limit`-th page is served
struct CancelAfter {
    served: Arc<AtomicUsize>,
    limit: usize,
    cancel: CancellationToken,
}

impl Respond for CancelAfter {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if served == self.limit {
            self.cancel.cancel();
        }
        ResponseTemplate::new(200).set_body_string(TRACKLIST)
    }
}

#[tokio::test]
async fn test_cancelled_run_resumes_with_remaining_items() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    let served = Arc::new(AtomicUsize::new(0));
    let first_cancel = CancellationToken::new();
    Mock::given(method("GET"))
        .and(path_regex(r"^/albums/"))
        .respond_with(CancelAfter {
            served: Arc::clone(&served),
            limit: 40,
            cancel: first_cancel.clone(),
        })
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), 1);
    let albums: Vec<_> = (0..100).map(|i| album(&base_url, 1, i)).collect();
    CsvCheckpoint::<AlbumRecord>::new(config.output.albums_path())
        .write_all(&albums)
        .unwrap();
    let tracks = CsvCheckpoint::<TrackRecord>::new(config.output.tracks_path());

    let outcome = coordinator(config.clone(), first_cancel)
        .run(&[StageKind::Tracks])
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.reports()[0].completed, 40);
    assert_eq!(served.load(Ordering::SeqCst), 40);

    let done: HashSet<_> = tracks
        .load()
        .unwrap()
        .into_iter()
        .map(|t| t.album_url)
        .collect();
    assert_eq!(done.len(), 40);

    let outcome = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Tracks])
        .await
        .unwrap();
    assert!(!outcome.is_cancelled());
    assert_eq!(outcome.reports()[0].skipped, 40);
    assert_eq!(outcome.reports()[0].completed, 60);
    assert_eq!(served.load(Ordering::SeqCst), 100);

    let rows = tracks.load().unwrap();
    assert_eq!(rows.len(), 200);
    let done: HashSet<_> = rows.into_iter().map(|t| t.album_url).collect();
    assert_eq!(done.len(), 100);
}

#[tokio::test]
async fn test_failure_is_cleared_once_it_succeeds() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    let config = create_test_config(&base_url, dir.path(), 1);
    CsvCheckpoint::<BandRecord>::new(config.output.bands_path())
        .write_all(&[BandRecord {
            metallum_band_id: "42".to_string(),
            name: "Deicide".to_string(),
            genre: "Death Metal".to_string(),
            country: "United States".to_string(),
            status: "Active".to_string(),
            url: format!("{}/bands/Deicide/42", base_url),
        }])
        .unwrap();
    let failed = CsvCheckpoint::<FailedDiscography>::new(config.output.failed_discographies_path());
    let albums = CsvCheckpoint::<AlbumRecord>::new(config.output.albums_path());

    Mock::given(method("GET"))
        .and(path("/band/discography/id/42/tab/all"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    coordinator(config.clone(), CancellationToken::new())
        .run(&[StageKind::Albums])
        .await
        .unwrap();
    assert_eq!(failed.load().unwrap().len(), 1);

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/band/discography/id/42/tab/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<table class="display discog">
                <thead><tr><th>Name</th><th>Type</th><th>Year</th><th>Reviews</th></tr></thead>
                <tbody>
                  <tr><td><a href="{0}/albums/Deicide/Legion/99">Legion</a></td><td>Full-length</td><td>1992</td><td></td></tr>
                </tbody>
            </table>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    coordinator(config, CancellationToken::new())
        .run(&[StageKind::Albums])
        .await
        .unwrap();

    assert!(failed.load().unwrap().is_empty());
    let rows = albums.load().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metallum_album_id, "99");
    assert_eq!(rows[0].band_name, "Deicide");
}

#[tokio::test]
async fn test_full_pipeline() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/browse/ajax-letter/l/C/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            1,
            vec![band_row(&base_url, 123, "Cannibal Corpse")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_empty_buckets(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/band/discography/id/123/tab/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<table class="display discog">
                <thead><tr><th>Name</th><th>Type</th><th>Year</th><th>Reviews</th></tr></thead>
                <tbody>
                  <tr><td><a href="{0}/albums/Cannibal_Corpse/Tomb_of_the_Mutilated/1500">Tomb of the Mutilated</a></td><td>Full-length</td><td>1992</td><td>9 (80%)</td></tr>
                </tbody>
            </table>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/Cannibal_Corpse/Tomb_of_the_Mutilated/1500"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TRACKLIST))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), 3);
    let tracks_path = config.output.tracks_path();
    let outcome = coordinator(config, CancellationToken::new())
        .run(&StageKind::ALL)
        .await
        .unwrap();

    let PipelineOutcome::Completed(reports) = outcome else {
        panic!("pipeline was cancelled");
    };
    let stages: Vec<_> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, StageKind::ALL.to_vec());

    let tracks = CsvCheckpoint::<TrackRecord>::new(tracks_path).load().unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].band_name, "Cannibal Corpse");
    assert_eq!(tracks[0].metallum_band_id, "123");
    assert_eq!(tracks[0].metallum_album_id, "1500");
    assert_eq!(tracks[0].album_name, "Tomb of the Mutilated");
}

#[tokio::test]
async fn test_malformed_checkpoint_is_fatal() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let config = create_test_config(&mock_server.uri(), dir.path(), 1);
    std::fs::write(config.output.bands_path(), "metallum_band_id,name\n1\n")
        .unwrap();

    let err = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Albums])
        .await
        .unwrap_err();

    assert!(err.is_fatal_configuration());
    assert!(matches!(err, CrawlError::Checkpoint(_)));
}

#[tokio::test]
async fn test_missing_seed_file_is_fatal() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let config = create_test_config(&mock_server.uri(), dir.path(), 1);
    let err = coordinator(config, CancellationToken::new())
        .run(&[StageKind::Tracks])
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::MissingSeed { stage: "tracks", .. }));
}

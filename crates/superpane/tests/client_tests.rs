use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use superpane::storage::FetchKind;
use superpane::types::{DocumentStatus, FieldPath, PaneError, PhysicalRecord};
use superpane::{MemoryStore, PaginatedClient, PaneConfig, PaneSignal, PaneSignals};

fn post(id: &str, title: &str) -> PhysicalRecord {
    PhysicalRecord::new(id, "post").with_field("title", title)
}

fn draft(id: &str, title: &str) -> PhysicalRecord {
    post(&format!("drafts.{id}"), title)
}

fn config() -> PaneConfig {
    PaneConfig::new("post")
        .with_search_field(Some(FieldPath::parse("title").unwrap()))
        .with_columns(vec![FieldPath::parse("title").unwrap()])
        .with_live_updates(false)
}

fn client(store: &Arc<MemoryStore>, config: PaneConfig) -> PaginatedClient {
    PaginatedClient::new(store.clone(), config)
}

fn ids(client: &PaginatedClient) -> Vec<String> {
    client
        .results()
        .into_iter()
        .map(|row| row.logical_id)
        .collect()
}

fn numbered(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("p{i:02}")).collect()
}

#[tokio::test]
async fn test_empty_store() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let client = client(&store, config());
    client.load().await;

    assert!(client.results().is_empty());
    assert_eq!(client.total(), 0);
    assert_eq!(client.total_pages(), 0);
    assert!(!client.loading());
    // Nothing to merge, so nothing is fetched
    assert_eq!(store.fetch_count(FetchKind::Documents), 0);
    Ok(())
}

#[tokio::test]
async fn test_published_only_pages() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records(
        (0..30).map(|i| post(&format!("p{i:02}"), &format!("Post {i}"))),
    ));
    let client = client(&store, config());
    client.load().await;

    assert_eq!(client.total(), 30);
    assert_eq!(client.total_pages(), 2);
    assert_eq!(ids(&client), numbered(0..25));
    assert!(client
        .results()
        .iter()
        .all(|row| row.status == DocumentStatus::Published));

    client.next_page().await;
    assert_eq!(client.page(), 1);
    assert_eq!(ids(&client), numbered(25..30));

    // Already on the last page
    client.next_page().await;
    assert_eq!(client.page(), 1);

    client.previous_page().await;
    assert_eq!(ids(&client), numbered(0..25));
    Ok(())
}

#[tokio::test]
async fn test_draft_pairs_count_once_and_show_the_draft() -> Result<()> {
    let mut records: Vec<PhysicalRecord> = (0..10)
        .map(|i| post(&format!("p{i:02}"), &format!("Published {i}")))
        .collect();
    records.extend((0..10).map(|i| draft(&format!("p{i:02}"), &format!("Draft {i}"))));
    let store = Arc::new(MemoryStore::with_records(records));
    let client = client(&store, config());
    client.load().await;

    assert_eq!(client.total(), 10);
    let rows = client.results();
    assert_eq!(rows.len(), 10);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.logical_id, format!("p{i:02}"));
        assert_eq!(row.record_id, format!("drafts.p{i:02}"));
        assert_eq!(row.status, DocumentStatus::Draft);
        assert_eq!(row.field("title"), Some(&serde_json::json!(format!("Draft {i}"))));
    }
    Ok(())
}

#[tokio::test]
async fn test_unpublished_drafts_are_listed() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([
        post("a", "Alpha"),
        draft("b", "Beta"),
        post("c", "Gamma"),
    ]));
    let client = client(&store, config());
    client.load().await;

    let statuses: Vec<(String, DocumentStatus)> = client
        .results()
        .into_iter()
        .map(|row| (row.logical_id, row.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("a".to_string(), DocumentStatus::Published),
            ("b".to_string(), DocumentStatus::Unpublished),
            ("c".to_string(), DocumentStatus::Published),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_rows_keep_store_order() -> Result<()> {
    // The store returns projections sorted by id, the page must not follow
    let store = Arc::new(MemoryStore::with_records([
        post("zeta", "Z"),
        post("alpha", "A"),
        draft("mid", "M"),
        post("beta", "B"),
    ]));
    let client = client(&store, config());
    client.load().await;

    assert_eq!(ids(&client), vec!["zeta", "alpha", "mid", "beta"]);
    Ok(())
}

#[tokio::test]
async fn test_reload_is_idempotent() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([
        post("a", "Alpha"),
        post("b", "Beta"),
        draft("a", "Alpha draft"),
    ]));
    let client = client(&store, config());
    client.load().await;
    let first = client.state();

    client.refresh().await;
    assert_eq!(client.state(), first);
    Ok(())
}

#[tokio::test]
async fn test_search_filters_and_resets_page() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records((0..30).map(|i| {
        let word = if i % 2 == 0 { "alpha" } else { "beta" };
        post(&format!("p{i:02}"), &format!("{word} {i}"))
    })));
    let client = client(&store, config());
    client.load().await;
    client.set_page(1).await;
    assert_eq!(client.results().len(), 5);

    client.set_user_query("alp").await;
    assert_eq!(client.total(), 15);
    assert_eq!(client.page(), 0);
    assert_eq!(client.results().len(), 15);
    assert!(client
        .results()
        .iter()
        .all(|row| row.field("title").and_then(|t| t.as_str()).is_some_and(|t| t.starts_with("alpha"))));

    // Blank query means no filter
    client.set_user_query("   ").await;
    assert_eq!(client.total(), 30);
    Ok(())
}

#[tokio::test]
async fn test_search_sees_the_draft_text() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([
        post("a", "Original"),
        draft("a", "Rewritten"),
        post("b", "Original too"),
    ]));
    let client = client(&store, config());
    client.set_user_query("rewritten").await;

    assert_eq!(client.total(), 1);
    assert_eq!(ids(&client), vec!["a"]);
    assert_eq!(client.results()[0].record_id, "drafts.a");
    assert_eq!(
        client.results()[0].field("title"),
        Some(&serde_json::json!("Rewritten"))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_search_input_waits_for_typing_to_pause() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records((0..30).map(|i| {
        let word = if i % 2 == 0 { "alpha" } else { "beta" };
        post(&format!("p{i:02}"), &format!("{word} {i}"))
    })));
    let client = client(&store, config());
    client.load().await;
    let search = client.search_input();

    search.input("al");
    search.input("alp");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.total(), 30);
    assert_eq!(client.state().user_query, "");

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(client.total(), 15);
    assert_eq!(client.state().user_query, "alp");

    // Clearing skips the debounce
    search.input("");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(client.total(), 30);
    assert_eq!(client.state().user_query, "");
    Ok(())
}

#[tokio::test]
async fn test_page_past_the_end_resets_to_first_page() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records(
        (0..30).map(|i| post(&format!("p{i:02}"), "Post")),
    ));
    let client = client(&store, config());
    client.load().await;

    client.set_page(7).await;
    assert_eq!(client.page(), 0);
    assert_eq!(ids(&client), numbered(0..25));
    Ok(())
}

#[tokio::test]
async fn test_page_size_change() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records(
        (0..30).map(|i| post(&format!("p{i:02}"), "Post")),
    ));
    let client = client(&store, config());
    client.load().await;

    client.set_page_size(10).await?;
    assert_eq!(client.total_pages(), 3);
    assert_eq!(ids(&client), numbered(0..10));

    assert_eq!(client.set_page_size(0).await, Err(PaneError::InvalidPageSize));
    Ok(())
}

#[tokio::test]
async fn test_column_change_only_refetches_rows() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([
        post("a", "Alpha").with_field("views", 3),
        post("b", "Beta").with_field("views", 5),
    ]));
    let client = client(&store, config());
    client.load().await;
    let ids_fetches = store.fetch_count(FetchKind::Ids);
    assert_eq!(client.results()[0].field("views"), None);

    client
        .set_columns(vec![
            FieldPath::parse("title").unwrap(),
            FieldPath::parse("views").unwrap(),
        ])
        .await;

    assert_eq!(store.fetch_count(FetchKind::Ids), ids_fetches);
    assert_eq!(client.results()[1].field("views"), Some(&serde_json::json!(5)));
    Ok(())
}

#[tokio::test]
async fn test_failure_keeps_previous_state() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([post("a", "Alpha"), post("b", "Beta")]));
    let client = client(&store, config());
    client.load().await;
    let before = client.state();

    store.insert(post("c", "Gamma")).await;
    store.fail_next_fetches(10);
    client.refresh().await;

    assert_eq!(client.state(), before);
    assert!(!client.loading());

    store.fail_next_fetches(0);
    client.refresh().await;
    assert_eq!(client.total(), 3);
    assert_eq!(ids(&client), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_page_is_discarded() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records(
        (0..30).map(|i| post(&format!("p{i:02}"), "Post")),
    ));
    let client = client(&store, config().with_page_size(10));
    client.load().await;
    store.set_latency(Duration::from_millis(50));

    let mut states = client.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            seen.push(states.borrow_and_update().page_ids.clone());
        }
        seen
    });

    tokio::join!(client.set_page(2), client.set_page(1));

    assert_eq!(client.page(), 1);
    assert_eq!(ids(&client), numbered(10..20));

    drop(client);
    let seen = observer.await?;
    assert!(seen.iter().all(|page| *page != numbered(20..30)));
    Ok(())
}

#[tokio::test]
async fn test_refresh_signal() -> Result<()> {
    let store = Arc::new(MemoryStore::with_records([post("a", "Alpha")]));
    let client = client(&store, config());
    client.load().await;

    let signals = PaneSignals::new();
    let binding = client.bind_signals(&signals);
    let mut states = client.subscribe();

    store.insert(post("b", "Beta")).await;
    assert_eq!(signals.notify(PaneSignal::Refresh), 1);
    tokio::time::timeout(Duration::from_secs(5), async {
        while states.borrow_and_update().total != 2 {
            states.changed().await.unwrap();
        }
    })
    .await?;
    assert_eq!(ids(&client), vec!["a", "b"]);

    drop(binding);
    Ok(())
}

mod common;

use audit_feed::config::{ClientConfig, StoreBackend};
use audit_feed::domain::id::SubjectId;
use audit_feed::domain::page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, PagedResult};
use audit_feed::domain::store::AuditStore;
use common::*;

// ── 25. second_page_holds_the_oldest_entry ─────────────────────────────────
// Three entries for subject 7, page 2 of size 2: only the oldest remains.

#[tokio::test]
async fn second_page_holds_the_oldest_entry() {
    let store = seeded_store(7, 3).await;

    let page = store
        .get_by_subject(SubjectId::new(7), PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();

    assert_eq!(page.total_count, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].message, "entry 1");
    assert!(!page.has_more());
}

// ── 26. first_page_is_newest_first ─────────────────────────────────────────

#[tokio::test]
async fn first_page_is_newest_first() {
    let store = seeded_store(7, 3).await;

    let page = store
        .get_by_subject(SubjectId::new(7), PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap();

    let messages: Vec<&str> = page.items.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["entry 3", "entry 2"]);
    assert!(page.has_more());
}

// ── 27. other_subjects_are_invisible ───────────────────────────────────────

#[tokio::test]
async fn other_subjects_are_invisible() {
    let store = seeded_store(7, 2).await;

    let page = store
        .get_by_subject(SubjectId::new(8), PageRequest::default())
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    assert!(!page.has_more());
}

// ── 28. page_past_the_end_is_empty ─────────────────────────────────────────

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let store = seeded_store(1, 3).await;

    let page = store
        .get_by_subject(SubjectId::new(1), PageRequest::new(Some(9), Some(2)))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 3);
}

// ── 29. ids_are_monotonic ──────────────────────────────────────────────────

#[tokio::test]
async fn ids_are_monotonic() {
    let store = seeded_store(2, 4).await;
    let ids: Vec<i64> = store.snapshot().iter().map(|e| e.id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
    assert_eq!(store.len(), 4);
}

// ── 30. page_request_normalisation ─────────────────────────────────────────

#[test]
fn page_request_normalisation() {
    let defaults = PageRequest::new(None, None);
    assert_eq!(defaults.page(), 1);
    assert_eq!(defaults.page_size(), DEFAULT_PAGE_SIZE);

    let negative = PageRequest::new(Some(-3), Some(0));
    assert_eq!(negative.page(), 1);
    assert_eq!(negative.page_size(), DEFAULT_PAGE_SIZE);

    let huge = PageRequest::new(Some(3), Some(10_000));
    assert_eq!(huge.page_size(), MAX_PAGE_SIZE);
    assert_eq!(huge.offset(), 2 * MAX_PAGE_SIZE);
}

// ── 31. paged_result_serialises_has_more ───────────────────────────────────

#[test]
fn paged_result_serialises_has_more() {
    let result = PagedResult::new(
        vec![entry(3, 7, "entry 3")],
        PageRequest::new(Some(1), Some(1)),
        3,
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["pageSize"], 1);
    assert_eq!(json["totalCount"], 3);
    assert_eq!(json["hasMore"], true);
    assert_eq!(json["items"][0]["subjectId"], 7);

    let back: PagedResult<audit_feed::domain::audit::AuditEntry> =
        serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

// ── 69. get_all_spans_subjects_newest_first ────────────────────────────────

#[tokio::test]
async fn get_all_spans_subjects_newest_first() {
    let store = audit_feed::infra::memory::MemoryAuditStore::new();
    for (i, subject) in [1, 2, 1, 3].into_iter().enumerate() {
        let new_entry = audit_feed::domain::audit::NewAuditEntry {
            subject_id: SubjectId::new(subject),
            message: format!("entry {i}"),
            created_at: chrono::DateTime::from_timestamp(1_700_000_000 + i as i64, 0).unwrap(),
        };
        store.append(&new_entry).await.unwrap();
    }

    let first = store.get_all(PageRequest::new(Some(1), Some(3))).await.unwrap();
    let subjects: Vec<i64> = first.items.iter().map(|e| e.subject_id.get()).collect();
    assert_eq!(subjects, [3, 1, 2]);
    assert_eq!(first.total_count, 4);
    assert!(first.has_more());

    let second = store.get_all(PageRequest::new(Some(2), Some(3))).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].message, "entry 0");
    assert!(!second.has_more());
}

// ── 32. client_config_derives_urls ─────────────────────────────────────────

#[test]
fn client_config_derives_urls() {
    let config = ClientConfig::new("https://audit.example.com/").unwrap();
    assert_eq!(config.api_base(), "https://audit.example.com");
    assert_eq!(
        config.hub_url().unwrap().as_str(),
        "wss://audit.example.com/hubs/audit"
    );
    assert_eq!(
        config.entries_url(SubjectId::new(12)).unwrap().as_str(),
        "https://audit.example.com/api/subjects/12/entries"
    );

    let plain = ClientConfig::new("http://localhost:3000").unwrap();
    assert_eq!(plain.hub_url().unwrap().as_str(), "ws://localhost:3000/hubs/audit");

    assert!(ClientConfig::new("ftp://example.com").is_err());
    assert!(ClientConfig::new("not a url").is_err());
}

// ── 33. store_backend_parsing ──────────────────────────────────────────────

#[test]
fn store_backend_parsing() {
    assert_eq!(StoreBackend::try_from("Postgres").unwrap(), StoreBackend::Postgres);
    assert_eq!(StoreBackend::try_from(" memory ").unwrap(), StoreBackend::Memory);
    assert!(StoreBackend::try_from("redis").is_err());
}

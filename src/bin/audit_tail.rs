//! Prints a subject's audit history, then follows new entries live.
//!
//! Usage: `audit_tail <subject-id> [page-size]` with `AUDIT_API_BASE` set.

use {
    audit_feed::{
        client::{
            feed::LiveFeed, history::HttpEntryHistory, subscription::SubjectSubscription,
            ws::WsHubConnection,
        },
        config::ClientConfig,
        domain::{audit::AuditEntry, error::AuditError, id::SubjectId},
    },
    std::{env, sync::Arc},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() -> Result<(), AuditError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    dotenvy::dotenv().ok();

    let mut args = env::args().skip(1);
    let subject_id = args
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .map(SubjectId::new)
        .ok_or_else(|| AuditError::Validation("usage: audit_tail <subject-id> [page-size]".into()))?;
    let page_size = args.next().and_then(|s| s.parse::<i64>().ok()).unwrap_or(20);

    let config = ClientConfig::from_env()?;
    let subscription = Arc::new(SubjectSubscription::new(WsHubConnection::new(
        config.hub_url()?,
    )));
    let history = Arc::new(HttpEntryHistory::new(config));

    let feed = LiveFeed::mount(subscription.clone(), history, subject_id, page_size).await?;
    let snapshot = feed.snapshot();
    if snapshot.is_empty() {
        println!("no entries for subject {subject_id}");
    }
    for entry in snapshot.items.iter().rev() {
        print_entry(entry);
    }
    if snapshot.has_more() {
        println!("... {} older entries not shown", snapshot.total_count - snapshot.items.len() as i64);
    }

    let _printer = subscription.subscribe(move |entry| {
        if entry.subject_id == subject_id {
            print_entry(entry);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AuditError::Transport(format!("ctrl+c handler: {e}")))?;
    feed.unmount().await
}

fn print_entry(entry: &AuditEntry) {
    println!(
        "{} #{} {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.id,
        entry.message
    );
}

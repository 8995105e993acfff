use {
    crate::domain::{
        audit::{AuditEntry, NewAuditEntry},
        error::AuditError,
        id::SubjectId,
        page::{PageRequest, PagedResult},
        store::{AuditStore, StoreFuture},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

type EntryRow = (i64, i64, String, DateTime<Utc>);

fn entry_from_row((id, subject_id, message, created_at): EntryRow) -> AuditEntry {
    AuditEntry {
        id,
        subject_id: SubjectId::new(subject_id),
        message,
        created_at,
    }
}

pub async fn insert_audit_entry(
    pool: &PgPool,
    entry: &NewAuditEntry,
) -> Result<AuditEntry, AuditError> {
    // created_at comes back at the column's microsecond precision, so the
    // published entry equals what a later page read returns.
    let row = sqlx::query_as::<_, EntryRow>(
        r#"
        INSERT INTO audit_entries (subject_id, message, created_at)
        VALUES ($1, $2, $3)
        RETURNING id, subject_id, message, created_at
        "#,
    )
    .bind(entry.subject_id.get())
    .bind(&entry.message)
    .bind(entry.created_at)
    .fetch_one(pool)
    .await?;

    Ok(entry_from_row(row))
}

/// Newest first; `id` breaks ties between entries sharing a timestamp.
pub async fn get_by_subject(
    pool: &PgPool,
    subject_id: SubjectId,
    page: PageRequest,
) -> Result<PagedResult<AuditEntry>, AuditError> {
    let total_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_entries WHERE subject_id = $1")
            .bind(subject_id.get())
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query_as::<_, EntryRow>(
        r#"
        SELECT id, subject_id, message, created_at
        FROM audit_entries
        WHERE subject_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(subject_id.get())
    .bind(page.page_size())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(entry_from_row).collect();
    Ok(PagedResult::new(items, page, total_count))
}

pub async fn get_all(
    pool: &PgPool,
    page: PageRequest,
) -> Result<PagedResult<AuditEntry>, AuditError> {
    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_entries")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, EntryRow>(
        r#"
        SELECT id, subject_id, message, created_at
        FROM audit_entries
        ORDER BY created_at DESC, id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.page_size())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(entry_from_row).collect();
    Ok(PagedResult::new(items, page, total_count))
}

#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AuditStore for PgAuditStore {
    fn append<'a>(&'a self, entry: &'a NewAuditEntry) -> StoreFuture<'a, AuditEntry> {
        Box::pin(insert_audit_entry(&self.pool, entry))
    }

    fn get_by_subject(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        Box::pin(get_by_subject(&self.pool, subject_id, page))
    }

    fn get_all(&self, page: PageRequest) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        Box::pin(get_all(&self.pool, page))
    }
}

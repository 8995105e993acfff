//! Ambient subject binding for one logical call chain.
//!
//! A chain is a future wrapped by [`chain`], [`with_subject`] or [`propagate`].
//! Inside it, [`push`] rebinds the current subject until the returned guard is
//! popped or dropped. Chains never see each other's bindings, whichever worker
//! thread polls them.

use {
    crate::domain::{fields::Fields, id::SubjectId},
    std::{cell::Cell, future::Future},
};

tokio::task_local! {
    static CURRENT_SUBJECT: Cell<Option<SubjectId>>;
}

/// Run `fut` as a new chain with no subject bound.
pub async fn chain<F: Future>(fut: F) -> F::Output {
    CURRENT_SUBJECT.scope(Cell::new(None), fut).await
}

/// Run `fut` as a new chain with `subject_id` bound.
pub async fn with_subject<F: Future>(subject_id: SubjectId, fut: F) -> F::Output {
    CURRENT_SUBJECT.scope(Cell::new(Some(subject_id)), fut).await
}

/// Wrap `fut` in a new chain that starts from the caller's current binding.
/// Use when spawning work the caller logically contains.
pub fn propagate<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    CURRENT_SUBJECT.scope(Cell::new(current()), fut)
}

pub fn sync_with_subject<R>(subject_id: SubjectId, f: impl FnOnce() -> R) -> R {
    CURRENT_SUBJECT.sync_scope(Cell::new(Some(subject_id)), f)
}

/// Subject bound on this chain, if any.
pub fn current() -> Option<SubjectId> {
    CURRENT_SUBJECT.try_with(Cell::get).ok().flatten()
}

/// Bind `subject_id` until the guard is popped.
///
/// Callers must already run inside [`chain`], [`with_subject`] or
/// [`propagate`]. Outside a chain nothing is bound: the guard is inert,
/// [`current`] stays `None` and a warning is logged, since audit entries the
/// caller expected to attribute will not be persisted.
pub fn push(subject_id: SubjectId) -> ScopeGuard {
    match CURRENT_SUBJECT.try_with(|slot| slot.replace(Some(subject_id))) {
        Ok(previous) => ScopeGuard {
            restore: Some(previous),
        },
        Err(_) => {
            tracing::warn!(%subject_id, "subject pushed outside a scope chain, ignoring");
            ScopeGuard { restore: None }
        }
    }
}

/// Push the subject carried by `fields`, if they carry one.
pub fn push_from_fields(fields: &Fields) -> Option<ScopeGuard> {
    fields.subject_id().map(push)
}

/// Restores the enclosing binding when popped or dropped.
#[must_use = "the subject is unbound as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    restore: Option<Option<SubjectId>>,
}

impl ScopeGuard {
    /// Restore the binding that was current before the matching push.
    /// Popping an already popped guard does nothing.
    pub fn pop(&mut self) {
        if let Some(previous) = self.restore.take() {
            let _ = CURRENT_SUBJECT.try_with(|slot| slot.set(previous));
        }
    }

    pub fn is_active(&self) -> bool {
        self.restore.is_some()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.pop();
    }
}

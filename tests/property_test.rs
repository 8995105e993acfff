use audit_feed::domain::fields::Fields;
use audit_feed::domain::id::SubjectId;
use audit_feed::domain::level::LogLevel;
use audit_feed::domain::page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, PagedResult};
use audit_feed::scope;
use proptest::prelude::*;

fn arb_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Information),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

proptest! {
    /// Pushing any stack of subjects and popping it in reverse restores every
    /// enclosing binding, ending unbound.
    #[test]
    fn nested_scope_unwinds_to_each_enclosing_subject(
        ids in prop::collection::vec(any::<i64>(), 1..16)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(scope::chain(async {
            let mut guards = Vec::new();
            for id in &ids {
                guards.push(scope::push(SubjectId::new(*id)));
                assert_eq!(scope::current(), Some(SubjectId::new(*id)));
            }
            for depth in (0..ids.len()).rev() {
                guards[depth].pop();
                let expected = depth.checked_sub(1).map(|d| SubjectId::new(ids[d]));
                assert_eq!(scope::current(), expected);
            }
        }));
    }

    /// Normalised requests are always within bounds.
    #[test]
    fn page_request_is_always_in_bounds(page in any::<Option<i64>>(), size in any::<Option<i64>>()) {
        let req = PageRequest::new(page, size);
        prop_assert!(req.page() >= 1);
        prop_assert!((1..=MAX_PAGE_SIZE).contains(&req.page_size()));
        prop_assert!(req.offset() >= 0);
        if size.is_none_or(|s| s <= 0) {
            prop_assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
        }
    }

    /// has_more is true exactly when entries exist past the current page.
    #[test]
    fn has_more_matches_remaining_entries(
        page in 1i64..50,
        size in 1i64..=MAX_PAGE_SIZE,
        total in 0i64..10_000,
    ) {
        let result: PagedResult<()> =
            PagedResult::new(Vec::new(), PageRequest::new(Some(page), Some(size)), total);
        let shown_through = page * size;
        prop_assert_eq!(result.has_more(), total > shown_through);
    }

    /// Templates without holes or braces render unchanged.
    #[test]
    fn brace_free_templates_render_verbatim(template in "[^{}]*") {
        let fields = Fields::new().with("id", 1);
        prop_assert_eq!(fields.render(&template), template);
    }

    /// Only integer reserved fields attribute a subject.
    #[test]
    fn integer_user_id_is_always_the_subject(id in any::<i64>(), text in ".*") {
        prop_assert_eq!(Fields::new().with("UserId", id).subject_id(), Some(SubjectId::new(id)));
        prop_assert_eq!(Fields::new().with("UserId", text).subject_id(), None);
    }

    /// as_str → try_from roundtrip is identity for every level.
    #[test]
    fn level_roundtrip(level in arb_level()) {
        prop_assert_eq!(LogLevel::try_from(level.as_str()).unwrap(), level);
    }
}

//! Guards the hot list paths against index regressions: the client-scoped
//! entry listing must walk `idx_entries_client_logged` instead of scanning
//! the table.

use timebank_store::{EntryFilter, Store};
use timebank_model::{ClientId, ProjectId, UserId};

#[test]
fn client_scoped_listing_uses_the_covering_index() {
    let store = Store::open_in_memory().expect("store");
    let filter = EntryFilter {
        client: Some(ClientId::new()),
        ..EntryFilter::default()
    };
    let plan = store.explain_entry_list_plan(&filter).expect("plan");
    let joined = plan.join("\n");
    assert!(
        joined.contains("idx_entries_client_logged"),
        "expected covering index in plan:\n{joined}"
    );
    assert!(
        !joined.contains("SCAN time_entries"),
        "listing must not full-scan:\n{joined}"
    );
}

#[test]
fn project_and_user_filters_use_their_indexes() {
    let store = Store::open_in_memory().expect("store");

    let by_project = store
        .explain_entry_list_plan(&EntryFilter {
            project: Some(ProjectId::new()),
            ..EntryFilter::default()
        })
        .expect("project plan")
        .join("\n");
    assert!(
        by_project.contains("idx_entries_project"),
        "project filter plan:\n{by_project}"
    );

    let by_user = store
        .explain_entry_list_plan(&EntryFilter {
            user: Some(UserId::new()),
            ..EntryFilter::default()
        })
        .expect("user plan")
        .join("\n");
    assert!(
        by_user.contains("idx_entries_user"),
        "user filter plan:\n{by_user}"
    );
}

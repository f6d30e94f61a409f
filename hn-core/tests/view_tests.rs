use hn_core::view::{byline, DEFAULT_DETAIL_TITLE, UNKNOWN_TITLE};
use hn_core::{ContentEntry, RowStatus, RowView, StoryDetail, StoryRecord};
use serde_json::json;

fn record(value: serde_json::Value) -> StoryRecord {
    serde_json::from_value(value).unwrap()
}

#[test]
fn placeholder_rows_show_the_story_id() {
    let absent = RowView::new(4, 8863, None);
    assert_eq!(absent.title, "8863");
    assert_eq!(absent.status, RowStatus::Placeholder);
    assert!(!absent.is_settled());

    let loading = RowView::new(4, 8863, Some(&ContentEntry::Loading));
    assert_eq!(loading.title, "8863");
    assert_eq!(loading.status, RowStatus::Loading);

    let failed = RowView::new(4, 8863, Some(&ContentEntry::Failed("timeout".into())));
    assert_eq!(failed.status, RowStatus::Failed);
    assert!(failed.is_settled());
}

#[test]
fn ready_row_without_title_is_unknown() {
    let entry = ContentEntry::Ready(record(json!({ "id": 1, "by": "dang" })));
    let row = RowView::new(0, 1, Some(&entry));

    assert_eq!(row.title, UNKNOWN_TITLE);
    assert_eq!(row.byline.as_deref(), Some("by dang"));
    assert!(row.is_settled());
}

#[test]
fn byline_handles_fractional_time_and_missing_parts() {
    assert_eq!(
        byline(&record(json!({ "time": 1_175_714_200.0 }))).as_deref(),
        Some("on 2007-04-04 19:16 UTC")
    );
    assert_eq!(byline(&record(json!({ "title": "No meta" }))), None);
}

#[test]
fn text_posts_have_no_url_but_a_discussion_link() {
    let detail = StoryDetail::new(121003, &record(json!({ "id": 121003, "type": "story" })));

    assert_eq!(detail.title, DEFAULT_DETAIL_TITLE);
    assert_eq!(detail.url, None);
    assert_eq!(detail.discussion_url(), "https://news.ycombinator.com/item?id=121003");
}

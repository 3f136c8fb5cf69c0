use super::*;
use crate::permissions::PermissionSet;
use crate::store::{EventFilter, MemoryStore};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn calendar(id: i64, display_name: &str, account_name: &str, account_type: &str) -> CalendarRecord {
    CalendarRecord {
        id,
        display_name: display_name.to_string(),
        account_name: account_name.to_string(),
        account_type: account_type.to_string(),
    }
}

fn store_with(calendars: Vec<CalendarRecord>) -> MemoryStore {
    MemoryStore::with_calendars(PermissionSet::all_granted(), calendars)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0).unwrap()
}

#[test]
fn selector_picks_the_calendar_named_after_its_account() {
    // [{name:"A",acct:"x"}, {name:"x",acct:"x"}, {name:"B",acct:"y"}]
    // filtered to account type "x" must pick the second record.
    let store = store_with(vec![
        calendar(1, "A", "x", "x"),
        calendar(2, "x", "x", "x"),
        calendar(3, "B", "y", "y"),
    ]);

    let primary = find_primary_calendar(&store, "x").unwrap();
    assert_eq!(primary.id, 2);
    assert_eq!(primary.display_name, "x");
}

#[test]
fn selector_is_deterministic_first_match_wins() {
    let store = store_with(vec![
        calendar(1, "x", "x", "x"),
        calendar(2, "x", "x", "x"),
    ]);

    for _ in 0..3 {
        assert_eq!(find_primary_calendar(&store, "x").unwrap().id, 1);
    }
}

#[test]
fn selector_reports_no_calendar_found_as_a_normal_outcome() {
    let store = store_with(vec![calendar(1, "Holidays", "x", "x")]);
    let result = find_primary_calendar(&store, "x");
    assert!(matches!(result, Err(CalendarError::NoCalendarFound(t)) if t == "x"));
}

#[test]
fn aborted_selection_leaves_the_store_untouched() {
    // Selector found nothing, so the caller never reaches the writer; the
    // events collection must still be empty.
    let store = store_with(vec![calendar(1, "Holidays", "x", "x")]);

    assert!(find_primary_calendar(&store, "x").is_err());
    assert_eq!(query_events(&store, &EventFilter::default()).unwrap().count(), 0);
}

#[test]
fn written_event_is_found_by_a_window_and_title_query() {
    let store = store_with(vec![calendar(1, "x", "x", "x")]);

    let start = t0() + Duration::days(2) + Duration::hours(1); // T+2d 10:00
    let end = start + Duration::hours(1);
    let mut config = EventConfig::new(1, "Evt", start, end);
    config.description = "inserted for the round trip".to_string();

    let id = create_event(&store, &config).unwrap();

    let filter = EventFilter::window_with_title(t0(), t0() + Duration::days(7), "Evt");
    let found: Vec<EventRecord> = query_events(&store, &filter).unwrap().collect();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id.0);
    assert_eq!(found[0].start, start);
    assert_eq!(found[0].end, end);
    assert_eq!(found[0].calendar_id, 1);
}

#[test]
fn title_filter_is_exact_match() {
    let store = store_with(vec![calendar(1, "x", "x", "x")]);
    let start = t0() + Duration::hours(1);
    create_event(&store, &EventConfig::new(1, "Evt", start, start + Duration::hours(1))).unwrap();

    let filter = EventFilter::window_with_title(t0(), t0() + Duration::days(7), "Evt 2");
    assert_eq!(query_events(&store, &filter).unwrap().count(), 0);
}

#[test]
fn reader_orders_events_by_ascending_start() {
    let store = store_with(vec![calendar(1, "x", "x", "x")]);

    // Insert out of order.
    for offset_hours in [5_i64, 1, 3, 2, 4] {
        let start = t0() + Duration::hours(offset_hours);
        let config = EventConfig::new(1, "Ordered", start, start + Duration::minutes(30));
        create_event(&store, &config).unwrap();
    }

    let starts: Vec<DateTime<Utc>> = query_events(&store, &EventFilter::default())
        .unwrap()
        .map(|e| e.start)
        .collect();

    assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn writer_maps_store_rejection_to_write_failed() {
    let store = store_with(vec![calendar(1, "x", "x", "x")]);
    let start = t0();
    let config = EventConfig::new(99, "Orphan", start, start + Duration::hours(1));

    let result = create_event(&store, &config);
    assert!(matches!(result, Err(CalendarError::WriteFailed(_))));
}

#[test]
fn writer_records_the_timezone_identifier() {
    let store = store_with(vec![calendar(1, "x", "x", "x")]);
    let start = t0();
    let mut config = EventConfig::new(1, "Zoned", start, start + Duration::hours(1));
    config.timezone = chrono_tz::Tz::Europe__Helsinki;

    create_event(&store, &config).unwrap();
    let found: Vec<EventRecord> =
        query_events(&store, &EventFilter::default()).unwrap().collect();
    assert_eq!(found[0].timezone, "Europe/Helsinki");
}

#[test]
fn list_calendars_filters_by_account_type() {
    let store = store_with(vec![
        calendar(1, "a", "a", "com.google"),
        calendar(2, "b", "b", "com.exchange"),
    ]);

    let names: Vec<String> =
        list_calendars(&store, "com.google").unwrap().map(|c| c.display_name).collect();
    assert_eq!(names, vec!["a"]);
}

use super::*;

fn record(id: &str, status: &str) -> VideoRecord {
    VideoRecord {
        id: Some(id.to_string()),
        idea: Some(format!("idea {id}")),
        production: Some(status.to_string()),
        ..VideoRecord::default()
    }
}

fn numbered_table(count: usize) -> VideoTable {
    VideoTable::from_rows((1..=count).map(|id| record(&id.to_string(), "Done")).collect())
}

fn ids(page: &TablePage) -> Vec<String> {
    page.rows
        .iter()
        .map(|row| row.record.id.clone().unwrap_or_default())
        .collect()
}

#[test]
fn first_page_is_sorted_by_id_descending() {
    let table = numbered_table(25);
    let page = table.query(&TableQuery {
        page: 1,
        page_size: 10,
        ..TableQuery::default()
    });

    assert_eq!(page.total_pages, 3);
    assert_eq!(
        ids(&page),
        vec!["25", "24", "23", "22", "21", "20", "19", "18", "17", "16"]
    );
    let numbers: Vec<usize> = page.rows.iter().map(|row| row.item_number).collect();
    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
    assert!(!page.has_previous());
    assert!(page.has_next());
}

#[test]
fn last_page_holds_the_remainder() {
    let table = numbered_table(25);
    let page = table.query(&TableQuery {
        page: 3,
        page_size: 10,
        ..TableQuery::default()
    });

    assert_eq!(ids(&page), vec!["5", "4", "3", "2", "1"]);
    let numbers: Vec<usize> = page.rows.iter().map(|row| row.item_number).collect();
    assert_eq!(numbers, vec![21, 22, 23, 24, 25]);
    assert!(!page.has_next());
}

#[test]
fn out_of_range_pages_are_clamped() {
    let table = numbered_table(25);
    let page = table.query(&TableQuery {
        page: 99,
        page_size: 10,
        ..TableQuery::default()
    });
    assert_eq!(page.page, 3);

    let empty = VideoTable::default().query(&TableQuery {
        page: 0,
        page_size: 10,
        ..TableQuery::default()
    });
    assert_eq!(empty.page, 1);
    assert_eq!(empty.total_pages, 1);
    assert!(empty.rows.is_empty());
}

#[test]
fn status_filter_keeps_matching_rows_and_recomputes_metrics() {
    let table = VideoTable::from_rows(vec![
        record("1", "Done"),
        record("2", "Pending"),
        record("3", "done"),
        record("4", "Pending"),
        record("5", "DONE"),
    ]);

    let page = table.query(&TableQuery {
        status: Some("done".into()),
        ..TableQuery::default()
    });

    assert_eq!(ids(&page), vec!["5", "3", "1"]);
    assert_eq!(page.matching_rows, 3);
    assert_eq!(page.total_rows, 5);
    assert!(page.is_filtered());
    assert_eq!(
        page.metrics,
        Metrics {
            total: 3,
            completed: 3,
            in_progress: 0,
            pending: 0,
            with_video: 0,
        }
    );
}

#[test]
fn all_status_disables_filtering() {
    let table = VideoTable::from_rows(vec![record("1", "Done"), record("2", "Pending")]);
    let page = table.query(&TableQuery {
        status: Some(ALL_STATUSES.into()),
        ..TableQuery::default()
    });
    assert_eq!(page.matching_rows, 2);
    assert!(!page.is_filtered());
}

#[test]
fn search_matches_idea_or_caption_case_insensitively() {
    let mut robot = record("1", "Done");
    robot.idea = Some("Robot Chef".into());
    let mut beach = record("2", "Pending");
    beach.idea = None;
    beach.caption = Some("A ROBOT at the beach".into());
    let other = record("3", "Pending");
    let table = VideoTable::from_rows(vec![robot, beach, other]);

    let matches = table.filter(None, Some("robot"));
    let matched: Vec<_> = matches.iter().filter_map(|r| r.id.as_deref()).collect();
    assert_eq!(matched, vec!["1", "2"]);
}

#[test]
fn metrics_split_statuses_into_three_buckets() {
    let mut with_video = record("1", "Done");
    with_video.final_output = Some("https://cdn.example/1.mp4".into());
    let mut blank_video = record("2", "Working");
    blank_video.final_output = Some("   ".into());
    let mut unknown = record("3", "");
    unknown.production = None;
    let table = VideoTable::from_rows(vec![with_video, blank_video, unknown, record("4", "queued")]);

    let metrics = Metrics::from_rows(table.rows());
    assert_eq!(
        metrics,
        Metrics {
            total: 4,
            completed: 1,
            in_progress: 1,
            pending: 2,
            with_video: 1,
        }
    );
}

#[test]
fn numeric_ids_sort_before_text_and_missing_ids() {
    let mut no_id = record("0", "Done");
    no_id.id = None;
    let table = VideoTable::from_rows(vec![
        record("b", "Done"),
        no_id,
        record("2", "Done"),
        record("10", "Done"),
        record("a", "Done"),
    ]);
    let page = table.query(&TableQuery::default());
    let order: Vec<Option<String>> = page.rows.iter().map(|r| r.record.id.clone()).collect();
    assert_eq!(
        order,
        vec![
            Some("10".into()),
            Some("2".into()),
            Some("b".into()),
            Some("a".into()),
            None
        ]
    );
}

#[test]
fn status_options_list_distinct_values_in_first_seen_order() {
    let table = VideoTable::from_rows(vec![
        record("1", "Pending"),
        record("2", "Done"),
        record("3", "Pending"),
        record("4", " "),
    ]);
    assert_eq!(table.status_options(), vec!["All", "Pending", "Done"]);
}

#[test]
fn status_options_ignore_case_like_the_filter() {
    let table = VideoTable::from_rows(vec![
        record("1", "Done"),
        record("2", "done"),
        record("3", " DONE "),
        record("4", "all"),
        record("5", "Pending"),
    ]);
    assert_eq!(table.status_options(), vec!["All", "Done", "Pending"]);
    assert_eq!(table.filter(Some("Done"), None).len(), 3);
}

#[test]
fn missing_columns_are_reported_as_render_input_errors() {
    let table = VideoTable::new(vec![], vec![SheetColumn::Caption, SheetColumn::Date]);
    assert!(!table.has_column(SheetColumn::Caption));
    assert_eq!(
        table.render_input_error(),
        Some(RenderInputError::MissingColumns(vec![
            "Caption".into(),
            "Date".into()
        ]))
    );
    assert_eq!(VideoTable::default().render_input_error(), None);
}

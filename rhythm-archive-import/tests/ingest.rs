use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rhythm_archive_catalog::CatalogDocument;
use rhythm_archive_catalog::types::*;
use rhythm_archive_db::*;
use rhythm_archive_import::*;
use serde_json::json;

fn doc(value: serde_json::Value) -> CatalogDocument {
    serde_json::from_value(value).unwrap()
}

fn demo_doc() -> CatalogDocument {
    doc(json!({
        "game": { "name": "Demo" },
        "songs": [ {
            "title": "Alpha",
            "composers": [ { "name": "A" } ],
            "gameVersions": [ {
                "dlcName": "D1",
                "charts": [
                    { "difficultyName": "EASY", "level": 3 },
                    { "difficultyName": "HARD", "level": 10 }
                ]
            } ],
            "tags": ["X", "Y"]
        } ]
    }))
}

/// Three songs; the third carries a chart the fault trigger rejects.
fn faulty_doc() -> CatalogDocument {
    doc(json!({
        "game": { "name": "Demo" },
        "songs": [
            {
                "title": "One",
                "composers": [ { "name": "A" } ],
                "gameVersions": [ { "dlcName": "D1", "charts": [ { "difficultyName": "EASY", "level": 1 } ] } ],
                "tags": ["X"]
            },
            {
                "title": "Two",
                "composers": [ { "name": "B", "companyName": "Co" } ],
                "gameVersions": [ { "charts": [ { "difficultyName": "EASY", "level": 2 } ] } ],
                "tags": ["Y"]
            },
            {
                "title": "Three",
                "gameVersions": [ { "charts": [
                    { "difficultyName": "EASY", "level": 3 },
                    { "difficultyName": "BOOM", "level": 99 }
                ] } ]
            }
        ]
    }))
}

fn install_chart_fault(conn: &rusqlite::Connection) {
    conn.execute_batch(
        "CREATE TRIGGER fail_boom BEFORE INSERT ON charts
         WHEN NEW.difficulty_name = 'BOOM'
         BEGIN SELECT RAISE(ABORT, 'injected chart failure'); END;",
    )
    .unwrap();
}

fn run(conn: &rusqlite::Connection, doc: &CatalogDocument) -> IngestResult {
    ingest(conn, doc, &IngestOptions::default(), None).unwrap()
}

#[test]
fn demo_scenario_end_to_end() {
    let conn = open_memory().unwrap();

    let first = run(&conn, &demo_doc());
    assert!(first.committed);
    assert_eq!(first.game.outcome, Outcome::Created);
    let stats = catalog_stats(&conn).unwrap();
    assert_eq!(stats.games, 1);
    assert_eq!(stats.dlcs, 1);
    assert_eq!(stats.songs, 1);
    assert_eq!(stats.composers, 1);
    assert_eq!(stats.song_game_versions, 1);
    assert_eq!(stats.charts, 2);
    assert_eq!(stats.tags, 2);
    assert_eq!(stats.song_tags, 2);

    let second = run(&conn, &demo_doc());
    assert_eq!(second.game.outcome, Outcome::Reused);
    assert_eq!(second.game.row.id, first.game.row.id);
    let stats = catalog_stats(&conn).unwrap();
    assert_eq!(stats.games, 1);
    assert_eq!(stats.dlcs, 1);
    assert_eq!(stats.songs, 1);
    assert_eq!(stats.composers, 1);
    assert_eq!(stats.song_composers, 1);
    assert_eq!(stats.tags, 2);
    assert_eq!(stats.song_tags, 2);
    assert_eq!(stats.song_game_versions, 2);
    assert_eq!(stats.charts, 4);
}

#[test]
fn deduplicated_entities_keep_their_ids() {
    let conn = open_memory().unwrap();
    let first = run(&conn, &demo_doc());
    let second = run(&conn, &demo_doc());

    let (a, b) = (&first.songs[0], &second.songs[0]);
    assert_eq!(a.song.row.id, b.song.row.id);
    assert_eq!(a.composers[0].row.id, b.composers[0].row.id);
    assert_eq!(a.tags[0].row.id, b.tags[0].row.id);
    assert_eq!(a.tags[1].row.id, b.tags[1].row.id);

    let (dlc_a, dlc_b) = (
        a.game_versions[0].dlc.as_ref().unwrap(),
        b.game_versions[0].dlc.as_ref().unwrap(),
    );
    assert_eq!(dlc_a.row.id, dlc_b.row.id);
    assert_eq!(dlc_b.outcome, Outcome::Updated);

    assert_ne!(a.game_versions[0].version.id, b.game_versions[0].version.id);
    assert_ne!(a.game_versions[0].charts[0].id, b.game_versions[0].charts[0].id);
}

#[test]
fn failure_on_third_song_leaves_nothing() {
    let conn = open_memory().unwrap();
    install_chart_fault(&conn);

    let err = ingest(&conn, &faulty_doc(), &IngestOptions::default(), None).unwrap_err();
    assert!(matches!(err, IngestError::Db(OperationError::Sqlite(_))), "got {err:?}");
    assert!(!err.is_retryable());

    assert_eq!(catalog_stats(&conn).unwrap(), CatalogStats::default());
}

#[test]
fn failure_does_not_disturb_earlier_commits() {
    let conn = open_memory().unwrap();
    run(&conn, &demo_doc());
    let before = catalog_stats(&conn).unwrap();

    install_chart_fault(&conn);
    ingest(&conn, &faulty_doc(), &IngestOptions::default(), None).unwrap_err();

    assert_eq!(catalog_stats(&conn).unwrap(), before);
    assert!(find_song_by_title(&conn, "One").unwrap().is_none());
}

#[test]
fn composer_without_company_is_distinct() {
    let conn = open_memory().unwrap();
    let result = run(
        &conn,
        &doc(json!({
            "game": { "name": "Demo" },
            "songs": [ {
                "title": "Alpha",
                "composers": [ { "name": "X" }, { "name": "X", "companyName": "Y" } ],
                "gameVersions": []
            } ]
        })),
    );

    let composers = &result.songs[0].composers;
    assert_ne!(composers[0].row.id, composers[1].row.id);
    assert_eq!(composers[0].row.company_name, None);
    assert_eq!(composers[1].row.company_name.as_deref(), Some("Y"));
    let stats = catalog_stats(&conn).unwrap();
    assert_eq!(stats.composers, 2);
    assert_eq!(stats.song_composers, 2);
}

#[test]
fn blank_company_resolves_to_the_bare_composer() {
    let conn = open_memory().unwrap();
    let result = run(
        &conn,
        &doc(json!({
            "game": { "name": "Demo" },
            "songs": [ {
                "title": "Alpha",
                "composers": [ { "name": "X" }, { "name": "X", "companyName": "" } ],
                "gameVersions": []
            } ]
        })),
    );

    let composers = &result.songs[0].composers;
    assert_eq!(composers[0].row.id, composers[1].row.id);
    assert_eq!(composers[1].outcome, Outcome::Reused);
    let stats = catalog_stats(&conn).unwrap();
    assert_eq!(stats.composers, 1);
    assert_eq!(stats.song_composers, 1);
}

#[test]
fn round_trip_through_materialize() {
    let conn = open_memory().unwrap();
    let input = doc(json!({
        "game": { "name": "Demo", "publisher": "Pub", "extra": { "region": "JP" } },
        "songs": [
            {
                "title": "Alpha",
                "originalTitle": "アルファ",
                "songInfo": { "bpm": 150, "lengthSec": 120 },
                "composers": [ { "name": "A" }, { "name": "B", "companyName": "Co" } ],
                "gameVersions": [ {
                    "dlcName": "D1",
                    "charts": [
                        { "difficultyName": "EASY", "level": 3 },
                        { "difficultyName": "HARD", "level": 10.5, "noteCount": 812 }
                    ]
                } ],
                "tags": ["X", "Y"]
            },
            {
                "title": "Beta",
                "gameVersions": [ { "inGameTitle": "BETA", "charts": [ { "difficultyName": "MASTER", "level": 14 } ] } ],
                "tags": ["Y"]
            }
        ]
    }));
    run(&conn, &input);

    let graph = materialize_game(&conn, "Demo").unwrap();
    assert_eq!(graph.game.publisher.as_deref(), Some("Pub"));
    assert_eq!(graph.game.extra, Some(json!({ "region": "JP" })));
    assert_eq!(graph.dlcs.iter().map(|d| d.dlc_name.as_str()).collect::<Vec<_>>(), ["D1"]);

    let versions = &graph.song_game_versions;
    assert_eq!(versions.len(), input.songs.len());
    for (node, song) in versions.iter().zip(&input.songs) {
        assert_eq!(node.song.song.title, song.title);

        let composers: Vec<_> = node.song.composers.iter().map(|c| c.name.clone()).collect();
        let expected: Vec<_> = song.composers.iter().map(|c| c.name.clone()).collect();
        assert_eq!(composers, expected);

        let tags: Vec<_> = node.song.tags.iter().map(|t| t.name.clone()).collect();
        assert_eq!(tags, song.tags);

        let version = &song.game_versions[0];
        let charts: Vec<_> = node
            .charts
            .iter()
            .map(|c| (c.difficulty_name.clone(), c.level))
            .collect();
        let expected: Vec<_> = version
            .charts
            .iter()
            .map(|c| (c.difficulty_name.clone(), c.level))
            .collect();
        assert_eq!(charts, expected);
        assert_eq!(
            node.dlc.as_ref().map(|d| d.dlc_name.clone()),
            version.dlc_name.clone()
        );
    }

    let alpha_info = versions[0].song.info.as_ref().unwrap();
    assert_eq!(alpha_info.bpm, Some(150.0));
    assert_eq!(alpha_info.length_sec, Some(120));
    assert_eq!(versions[1].version.in_game_title.as_deref(), Some("BETA"));
}

#[test]
fn courses_leave_stored_state_unchanged() {
    let with = open_memory().unwrap();
    let without = open_memory().unwrap();

    let mut value = json!({
        "game": { "name": "Demo" },
        "songs": [ {
            "title": "Alpha",
            "gameVersions": [ { "charts": [ { "difficultyName": "EASY", "level": 3 } ] } ]
        } ]
    });
    run(&without, &doc(value.clone()));

    value["courses"] = json!([ {
        "courseName": "Marathon",
        "courseEntries": [ { "songTitle": "Alpha", "difficultyName": "EASY", "position": 1 } ]
    } ]);
    let result = run(&with, &doc(value));

    assert_eq!(result.courses_skipped, 1);
    assert_eq!(catalog_stats(&with).unwrap(), catalog_stats(&without).unwrap());
    assert_eq!(list_ingest_logs(&with, None).unwrap()[0].courses_skipped, 1);
}

#[test]
fn ingest_writes_one_log_entry() {
    let conn = open_memory().unwrap();
    let options = IngestOptions {
        source: Some("demo.json".to_string()),
        ..Default::default()
    };
    ingest(&conn, &demo_doc(), &options, None).unwrap();
    ingest(&conn, &demo_doc(), &options, None).unwrap();

    let logs = list_ingest_logs(&conn, None).unwrap();
    assert_eq!(logs.len(), 2);

    // Newest first.
    let rerun = &logs[0];
    assert_eq!(rerun.game_name, "Demo");
    assert_eq!(rerun.source.as_deref(), Some("demo.json"));
    assert_eq!(rerun.songs, 1);
    assert_eq!(rerun.records_created, 3);
    assert_eq!(rerun.records_reused, 8);
    assert_eq!(rerun.records_updated, 1);

    assert_eq!(logs[1].records_created, 12);
    assert_eq!(logs[1].records_reused, 0);
}

#[test]
fn dry_run_rolls_back() {
    let conn = open_memory().unwrap();
    let options = IngestOptions {
        dry_run: true,
        ..Default::default()
    };

    let result = ingest(&conn, &demo_doc(), &options, None).unwrap();
    assert!(!result.committed);
    assert_eq!(result.stats.total().created, 12);
    assert_eq!(catalog_stats(&conn).unwrap(), CatalogStats::default());
}

struct CancelAfterFirstSong(Arc<AtomicBool>);

impl IngestProgress for CancelAfterFirstSong {
    fn on_song(&self, current: usize, _total: usize, _title: &str) {
        if current == 1 {
            self.0.store(true, Ordering::Relaxed);
        }
    }
    fn on_phase(&self, _message: &str) {}
    fn on_complete(&self, _message: &str) {}
}

#[test]
fn cancellation_rolls_back() {
    let conn = open_memory().unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let options = IngestOptions {
        cancel: Some(flag.clone()),
        ..Default::default()
    };
    let progress = CancelAfterFirstSong(flag);

    let err = ingest(&conn, &faulty_doc(), &options, Some(&progress)).unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
    assert!(!err.is_retryable());
    assert_eq!(catalog_stats(&conn).unwrap(), CatalogStats::default());
}

#[test]
fn timeout_rolls_back() {
    let conn = open_memory().unwrap();
    let options = IngestOptions {
        timeout: Some(Duration::ZERO),
        ..Default::default()
    };

    let err = ingest(&conn, &demo_doc(), &options, None).unwrap_err();
    assert!(matches!(err, IngestError::TimedOut { .. }));
    assert_eq!(catalog_stats(&conn).unwrap(), CatalogStats::default());
}

#[test]
fn busy_store_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.db");

    let holder = open_database(&path).unwrap();
    let conn = open_database(&path).unwrap();
    conn.busy_timeout(Duration::ZERO).unwrap();

    holder.execute_batch("BEGIN IMMEDIATE").unwrap();
    let err = ingest(&conn, &demo_doc(), &IngestOptions::default(), None).unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");

    // The caller re-submits the whole document once the store is free.
    holder.execute_batch("ROLLBACK").unwrap();
    let result = ingest(&conn, &demo_doc(), &IngestOptions::default(), None).unwrap();
    assert!(result.committed);
    assert_eq!(catalog_stats(&conn).unwrap().games, 1);
}

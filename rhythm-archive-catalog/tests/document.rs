use chrono::NaiveDate;
use rhythm_archive_catalog::*;
use std::fs;
use tempfile::TempDir;

const DEMO_JSON: &str = r#"{
  "game": { "name": "Demo", "releaseDate": "2024-07-01", "publisher": "Pub", "extra": {"note": "x"} },
  "songs": [
    {
      "title": "Alpha",
      "originalTitle": "Alpha (Original)",
      "songInfo": { "bpm": 180, "beat": "4/4", "lengthSec": 120 },
      "composers": [ { "name": "A" }, { "name": "B", "companyName": "Co" } ],
      "gameVersions": [
        {
          "inGameTitle": "ALPHA",
          "dlcName": "D1",
          "dlcReleaseDate": "2024-07-10T09:00:00+09:00",
          "charts": [
            { "difficultyName": "EASY", "level": 3 },
            { "difficultyName": "HARD", "level": 10.5, "noteCount": 300, "chartType": "Double" }
          ]
        }
      ],
      "tags": ["X", "Y"]
    }
  ]
}"#;

const DEMO_YAML: &str = r#"
game:
  name: Demo
songs:
  - title: Alpha
    gameVersions:
      - charts:
          - difficultyName: EASY
            level: 3
courses:
  - courseName: Course 1
    courseEntries:
      - songTitle: Alpha
        difficultyName: EASY
        position: 1
"#;

#[test]
fn parse_json_document() {
    let doc = parse_document(DEMO_JSON, DocumentFormat::Json, "inline").unwrap();
    assert_eq!(doc.game.name, "Demo");
    assert_eq!(
        doc.game.release_date,
        Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    );
    assert_eq!(doc.songs.len(), 1);

    let song = &doc.songs[0];
    assert_eq!(song.composers.len(), 2);
    assert_eq!(song.composers[1].company_name.as_deref(), Some("Co"));
    assert_eq!(song.tags, vec!["X", "Y"]);

    let version = &song.game_versions[0];
    assert_eq!(version.dlc_name.as_deref(), Some("D1"));
    // RFC 3339 timestamps reduce to their UTC calendar date.
    assert_eq!(
        version.dlc_release_date,
        Some(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap())
    );
    assert_eq!(version.charts[1].level, 10.5);
    assert_eq!(version.charts[1].note_count, Some(300));
}

#[test]
fn courses_absent_by_default() {
    let doc = parse_document(DEMO_JSON, DocumentFormat::Json, "inline").unwrap();
    assert!(matches!(doc.courses, CourseSection::Absent));
    assert!(doc.courses.is_empty());
}

#[test]
fn courses_are_kept_as_not_ingested() {
    let doc = parse_document(DEMO_YAML, DocumentFormat::Yaml, "inline").unwrap();
    match &doc.courses {
        CourseSection::NotIngested(courses) => {
            assert_eq!(courses.len(), 1);
            assert_eq!(courses[0].course_name, "Course 1");
            assert_eq!(courses[0].course_entries[0].position, 1);
        }
        CourseSection::Absent => panic!("courses should be present"),
    }
    assert_eq!(doc.courses.len(), 1);
}

#[test]
fn optional_song_lists_default_to_empty() {
    let doc = parse_document(DEMO_YAML, DocumentFormat::Yaml, "inline").unwrap();
    let song = &doc.songs[0];
    assert!(song.composers.is_empty());
    assert!(song.tags.is_empty());
    assert!(song.song_info.is_none());
}

#[test]
fn missing_title_is_rejected() {
    let json = r#"{ "game": { "name": "G" }, "songs": [ { "gameVersions": [] } ] }"#;
    let err = parse_document(json, DocumentFormat::Json, "inline").unwrap_err();
    assert!(matches!(err, DocumentError::Json { .. }));
}

#[test]
fn invalid_date_is_rejected() {
    let json = r#"{ "game": { "name": "G", "releaseDate": "not a date" }, "songs": [] }"#;
    let err = parse_document(json, DocumentFormat::Json, "inline").unwrap_err();
    assert!(err.to_string().contains("invalid date"));
}

#[test]
fn blank_dates_are_absent() {
    let json = r#"{
        "game": { "name": "G", "releaseDate": "" },
        "songs": [ {
            "title": "Alpha",
            "gameVersions": [ {
                "dlcName": "D1",
                "dlcReleaseDate": " ",
                "firstDate": "",
                "charts": []
            } ]
        } ]
    }"#;
    let doc = parse_document(json, DocumentFormat::Json, "inline").unwrap();
    assert_eq!(doc.game.release_date, None);
    let version = &doc.songs[0].game_versions[0];
    assert_eq!(version.dlc_release_date, None);
    assert_eq!(version.first_date, None);
}

#[test]
fn parse_date_formats() {
    let d = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
    assert_eq!(parse_date("2023-01-31"), Some(d));
    assert_eq!(parse_date(" 2023-01-31 "), Some(d));
    assert_eq!(parse_date("2023-01-31T23:00:00Z"), Some(d));
    assert_eq!(parse_date("2023-02-01T01:00:00+09:00"), Some(d));
    assert_eq!(parse_date("31/01/2023"), None);
}

#[test]
fn load_document_by_extension() {
    let tmp = TempDir::new().unwrap();
    let json_path = tmp.path().join("demo.json");
    let yaml_path = tmp.path().join("demo.yml");
    fs::write(&json_path, DEMO_JSON).unwrap();
    fs::write(&yaml_path, DEMO_YAML).unwrap();

    assert_eq!(load_document(&json_path).unwrap().game.name, "Demo");
    assert_eq!(load_document(&yaml_path).unwrap().songs.len(), 1);
}

#[test]
fn load_document_unsupported_extension() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("demo.txt");
    fs::write(&path, DEMO_JSON).unwrap();
    assert!(matches!(
        load_document(&path),
        Err(DocumentError::UnsupportedFormat(_))
    ));
}

#[test]
fn document_files_sorted_and_filtered() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.yaml"), DEMO_YAML).unwrap();
    fs::write(tmp.path().join("a.json"), DEMO_JSON).unwrap();
    fs::write(tmp.path().join("notes.md"), "ignored").unwrap();

    let files = document_files(tmp.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.json", "b.yaml"]);
}

#[test]
fn document_files_missing_dir() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(
        document_files(&missing),
        Err(DocumentError::DirNotFound(_))
    ));
}

#[test]
fn expand_paths_mixes_files_and_dirs() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("one.json"), DEMO_JSON).unwrap();
    fs::write(dir.join("two.yaml"), DEMO_YAML).unwrap();
    let single = tmp.path().join("single.json");
    fs::write(&single, DEMO_JSON).unwrap();

    let files = expand_paths(&[single.clone(), dir.clone()]).unwrap();
    assert_eq!(files, vec![single, dir.join("one.json"), dir.join("two.yaml")]);
}

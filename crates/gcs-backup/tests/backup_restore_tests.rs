//! Export and restore against real DuckDB stores

use gcs_backup::{
    backup, export_snapshot, render_artifact, restore, write_artifact, BackupOptions, Rejection,
    RestoreOutcome, RestoreRequest,
};
use gcs_core::{MissionLog, MissionPlan, NewMissionLog, NewMissionPlan};
use gcs_db::records::{
    insert_mission_log, insert_mission_plan, list_mission_logs, list_mission_plans,
};
use gcs_db::{DbResult, Store};
use gcs_ledger::{run_catalog, run_migrations, CATALOG};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn migrated_store() -> Store {
    let store = Store::in_memory().unwrap();
    run_migrations(&store).unwrap();
    store
}

fn log_named(name: &str) -> NewMissionLog {
    NewMissionLog {
        name: name.to_string(),
        date: "2024-05-01".to_string(),
        duration: "00:30:00".to_string(),
        status: "completed".to_string(),
        location: "Valley".to_string(),
        gps_track: Some(json!([{"lat": 46.1, "lng": 7.2, "alt": 90.5}])),
        detected_sites: Some(json!({"sites": [], "count": 0})),
    }
}

fn seed(store: &Store) {
    store
        .with_conn(|conn| -> DbResult<()> {
            insert_mission_log(conn, &log_named("Ridge survey"))?;
            insert_mission_log(conn, &log_named("Pilot's check; phase 2"))?;
            insert_mission_log(
                conn,
                &NewMissionLog {
                    gps_track: None,
                    detected_sites: Some(json!({
                        "note": "ruins; east wall -- partial 'collapse'",
                        "zone": "B"
                    })),
                    ..log_named("Sites")
                },
            )?;
            insert_mission_plan(
                conn,
                &NewMissionPlan {
                    name: "Grid A".to_string(),
                    altitude: Some(80.5),
                    speed: Some(12.25),
                    waypoints: json!([[46.1, 7.2], [46.2, 7.3]]),
                },
            )?;
            insert_mission_plan(
                conn,
                &NewMissionPlan {
                    name: "Loiter".to_string(),
                    altitude: None,
                    speed: None,
                    waypoints: json!([]),
                },
            )?;
            Ok(())
        })
        .unwrap();
}

fn rows(store: &Store) -> (Vec<MissionLog>, Vec<MissionPlan>) {
    store
        .with_conn(|conn| -> DbResult<_> {
            Ok((list_mission_logs(conn)?, list_mission_plans(conn)?))
        })
        .unwrap()
}

fn truncate(store: &Store) {
    store
        .with_conn(|conn| {
            conn.execute_batch("DELETE FROM mission_logs; DELETE FROM mission_plans;")
                .map_err(gcs_db::DbError::from)
        })
        .unwrap();
}

fn write_script(dir: &TempDir, name: &str, script: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, script).unwrap();
    path
}

fn forced(path: &Path) -> RestoreRequest {
    RestoreRequest {
        artifact: path.to_path_buf(),
        force: true,
    }
}

fn plain_plan_insert(store: &Store) -> i64 {
    store
        .with_conn(|conn| {
            conn.query_row(
                "INSERT INTO mission_plans (name, waypoints) VALUES ('plain', '[]') RETURNING id",
                [],
                |row| row.get(0),
            )
            .map_err(gcs_db::DbError::from)
        })
        .unwrap()
}

fn sequences(snapshot: &gcs_backup::Snapshot) -> Vec<gcs_backup::SequenceState> {
    snapshot.tables.iter().map(|t| t.sequence.clone()).collect()
}

fn insert_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| l.starts_with("INSERT")).collect()
}

#[test]
fn test_export_is_deterministic() {
    let store = migrated_store();
    seed(&store);

    let first = render_artifact(&export_snapshot(&store).unwrap());
    let second = render_artifact(&export_snapshot(&store).unwrap());

    assert_eq!(insert_lines(&first).len(), 5);
    assert_eq!(insert_lines(&first), insert_lines(&second));
}

#[test]
fn test_artifact_layout() {
    let store = migrated_store();
    seed(&store);
    let snapshot = export_snapshot(&store).unwrap();
    assert_eq!(snapshot.row_counts(), vec![("mission_logs", 3), ("mission_plans", 2)]);
    assert_eq!(snapshot.total_rows(), 5);
    assert_eq!(snapshot.schema_head.as_deref(), Some("002"));

    let text = render_artifact(&snapshot);
    assert!(text.contains("-- Schema-Version: 002"));
    assert!(text.contains("-- Tables: mission_logs (3 rows), mission_plans (2 rows)"));

    let begin = text.find("BEGIN TRANSACTION;").unwrap();
    let reset_logs = text.find("DELETE FROM \"mission_logs\";").unwrap();
    let reset_plans = text.find("DELETE FROM \"mission_plans\";").unwrap();
    let sequence = text
        .find("SELECT nextval('mission_logs_id_seq') FROM range(1, 4)")
        .unwrap();
    let commit = text.rfind("COMMIT;").unwrap();
    assert!(begin < reset_logs && reset_logs < reset_plans && reset_plans < sequence);
    assert!(sequence < commit);
    assert!(text.contains("SELECT nextval('mission_plans_id_seq') FROM range(1, 3)"));
    assert!(!text.contains("DROP SEQUENCE"));

    // JSON keys are sorted
    assert!(text.contains(r#"'{"count":0,"sites":[]}'"#));
}

#[test]
fn test_round_trip_restores_rows_and_sequences() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let original_rows = rows(&store);
    let original = export_snapshot(&store).unwrap();
    let path = write_artifact(dir.path(), "gcs_db_backup", &original).unwrap();

    truncate(&store);
    assert!(rows(&store).0.is_empty());

    let summary = match restore(&store, &forced(&path)).unwrap() {
        RestoreOutcome::Committed(summary) => summary,
        other => panic!("expected commit, got {other:?}"),
    };
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.tables[0].table, "mission_logs");
    assert_eq!(summary.tables[0].before, 0);
    assert_eq!(summary.tables[0].after, 3);
    assert_eq!(summary.tables[1].after, 2);

    assert_eq!(rows(&store), original_rows);
    let restored = export_snapshot(&store).unwrap();
    assert_eq!(sequences(&restored), sequences(&original));

    let next_id = store
        .with_conn(|conn| insert_mission_log(conn, &log_named("After restore")))
        .unwrap();
    assert_eq!(next_id, 4);
    assert_eq!(plain_plan_insert(&store), 3);
}

#[test]
fn test_restore_over_live_rows_keeps_rows_and_sequences() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let original_rows = rows(&store);
    let original = export_snapshot(&store).unwrap();
    let path = write_artifact(dir.path(), "gcs_db_backup", &original).unwrap();

    let summary = match restore(&store, &forced(&path)).unwrap() {
        RestoreOutcome::Committed(summary) => summary,
        other => panic!("expected commit, got {other:?}"),
    };
    let counts: Vec<_> = summary
        .tables
        .iter()
        .map(|t| (t.table, t.before, t.after))
        .collect();
    assert_eq!(
        counts,
        vec![("mission_logs", 3, 3), ("mission_plans", 2, 2)]
    );

    assert_eq!(rows(&store), original_rows);
    assert_eq!(
        sequences(&export_snapshot(&store).unwrap()),
        sequences(&original)
    );
}

#[test]
fn test_restore_into_fresh_store_advances_sequences() {
    let dir = TempDir::new().unwrap();
    let source = migrated_store();
    seed(&source);
    let snapshot = export_snapshot(&source).unwrap();
    let path = write_artifact(dir.path(), "gcs_db_backup", &snapshot).unwrap();

    let target = migrated_store();
    let outcome = restore(&target, &forced(&path)).unwrap();
    assert!(outcome.is_committed(), "{outcome:?}");

    assert_eq!(rows(&target), rows(&source));
    assert_eq!(
        sequences(&export_snapshot(&target).unwrap()),
        sequences(&snapshot)
    );
    assert_eq!(plain_plan_insert(&target), 3);
}

#[test]
fn test_restore_leaves_a_sequence_that_is_already_ahead() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let path = write_artifact(dir.path(), "p", &export_snapshot(&store).unwrap()).unwrap();

    // Hand out ids 3..=5 and discard them; the sequence now stands at 6
    for _ in 0..3 {
        plain_plan_insert(&store);
    }
    store
        .with_conn(|conn| {
            conn.execute_batch("DELETE FROM mission_plans WHERE id > 2")
                .map_err(gcs_db::DbError::from)
        })
        .unwrap();

    let outcome = restore(&store, &forced(&path)).unwrap();
    assert!(outcome.is_committed(), "{outcome:?}");
    assert_eq!(store.table_row_count("mission_plans").unwrap(), 2);
    assert_eq!(plain_plan_insert(&store), 6);
}

#[test]
fn test_quoted_semicolons_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let before = rows(&store);

    let report = backup(
        &store,
        &BackupOptions {
            dir: dir.path().to_path_buf(),
            prefix: "gcs_db_backup".to_string(),
        },
    )
    .unwrap();
    truncate(&store);

    let outcome = restore(&store, &forced(&report.path)).unwrap();
    assert!(outcome.is_committed(), "{outcome:?}");
    let after = rows(&store);
    assert_eq!(after, before);
    assert_eq!(after.0[1].name, "Pilot's check; phase 2");
}

#[test]
fn test_failed_statement_rolls_back_everything() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let before = rows(&store);

    let mut script = String::from("BEGIN TRANSACTION;\nDELETE FROM mission_logs;\n");
    for id in 101..=110 {
        script.push_str(&format!(
            "INSERT INTO mission_logs (id, name, date, duration, status, location) \
             VALUES ({id}, 'ok {id}', 'd', 'd', 's', 'l');\n"
        ));
    }
    script.push_str(
        "INSERT INTO mission_logs (id, name, date, duration, status, location) \
         VALUES (111, NULL, 'd', 'd', 's', 'l');\nCOMMIT;\n",
    );
    let path = write_script(&dir, "bad.sql", &script);

    match restore(&store, &forced(&path)).unwrap() {
        RestoreOutcome::RolledBack {
            index, statement, ..
        } => {
            assert_eq!(index, 12);
            assert!(statement.contains("111"));
        }
        other => panic!("expected rollback, got {other:?}"),
    }
    assert_eq!(rows(&store), before);
}

#[test]
fn test_restore_without_force_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);
    let path = write_script(&dir, "wipe.sql", "DELETE FROM mission_logs;");

    let outcome = restore(
        &store,
        &RestoreRequest {
            artifact: path,
            force: false,
        },
    )
    .unwrap();
    assert_eq!(outcome, RestoreOutcome::Rejected(Rejection::MissingForce));
    assert_eq!(store.table_row_count("mission_logs").unwrap(), 3);
}

#[test]
fn test_restore_missing_file_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);

    let outcome = restore(&store, &forced(&dir.path().join("absent.sql"))).unwrap();
    assert!(matches!(
        outcome,
        RestoreOutcome::Rejected(Rejection::ArtifactUnreadable { .. })
    ));
    assert_eq!(store.table_row_count("mission_logs").unwrap(), 3);
}

#[test]
fn test_malformed_artifacts_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    seed(&store);

    let unterminated = write_script(&dir, "a.sql", "DELETE FROM mission_logs;\nINSERT 'oops");
    let empty = write_script(&dir, "b.sql", "-- nothing here\nBEGIN;\nCOMMIT;\n");
    for path in [unterminated, empty] {
        let outcome = restore(&store, &forced(&path)).unwrap();
        assert!(
            matches!(
                outcome,
                RestoreOutcome::Rejected(Rejection::MalformedArtifact { .. })
            ),
            "{outcome:?}"
        );
    }
    assert_eq!(store.table_row_count("mission_logs").unwrap(), 3);
}

#[test]
fn test_restore_into_older_schema_is_rejected() {
    let dir = TempDir::new().unwrap();
    let source = migrated_store();
    seed(&source);
    let path = write_artifact(dir.path(), "p", &export_snapshot(&source).unwrap()).unwrap();

    let target = Store::in_memory().unwrap();
    run_catalog(&target, &CATALOG[..1]).unwrap();

    let outcome = restore(&target, &forced(&path)).unwrap();
    assert_eq!(
        outcome,
        RestoreOutcome::Rejected(Rejection::SchemaBehind {
            required: Some("002".to_string()),
            head: Some("001".to_string()),
        })
    );
    assert_eq!(target.table_row_count("mission_logs").unwrap(), 0);
}

#[test]
fn test_artifacts_never_overwrite() {
    let dir = TempDir::new().unwrap();
    let store = migrated_store();
    let snapshot = export_snapshot(&store).unwrap();

    let first = write_artifact(dir.path(), "gcs_db_backup", &snapshot).unwrap();
    let second = write_artifact(dir.path(), "gcs_db_backup", &snapshot).unwrap();

    assert_ne!(first, second);
    assert!(first.file_name() < second.file_name());
    assert!(first.exists() && second.exists());
}

#[test]
fn test_unwritable_directory_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let blocker = write_script(&dir, "not_a_dir", "");
    let store = migrated_store();

    let err = backup(
        &store,
        &BackupOptions {
            dir: blocker.join("backups"),
            prefix: "gcs_db_backup".to_string(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, gcs_backup::BackupError::ArtifactWrite { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_export_of_unmigrated_store_fails() {
    let store = Store::in_memory().unwrap();
    let err = export_snapshot(&store).unwrap_err();
    assert!(matches!(err, gcs_backup::BackupError::ExportFailed { .. }));
}

use campus_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn migrated_file_database_is_shared_across_pooled_connections() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("shared.db");
    let pool = create_pool(path.to_str().expect("utf-8 path"), DbRuntimeSettings::default())
        .expect("failed to create pool");

    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
        conn.execute(
            "INSERT INTO fanout_log (event_json) VALUES ('{}')",
            [],
        )
        .expect("failed to append");
    }

    // A second connection must observe the same schema and rows.
    let first = pool.get().expect("failed to get connection");
    let second = pool.get().expect("failed to get second connection");
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM fanout_log", [], |row| row.get(0))
        .expect("failed to count");
    assert_eq!(count, 1);
    drop(first);

    let applied = run_migrations(&second).expect("re-run should succeed");
    assert_eq!(applied, 0);
}

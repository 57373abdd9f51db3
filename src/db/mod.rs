//! Pooled SQLite connections.
//!
//! The teacher's equivalent (`memory/manager.rs`) opens a single
//! `Connection` behind a lock — adequate for one writer at a time. Here, the
//! Ingress Dispatcher spawns one worker per TCP connection and many workers
//! commit transactions concurrently, so a real connection pool is used
//! instead, built from the `r2d2`/`r2d2_sqlite` dependencies the teacher
//! already carried (unused in the teacher, put to work here).

pub mod schema;

use r2d2_sqlite::SqliteConnectionManager;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

pub fn open_pool(path: &str) -> Result<DbPool, crate::errors::PersistenceError> {
    // A `:memory:` SQLite connection is private to the connection that opened
    // it; handing out more than one from the pool would mean writes on one
    // connection are invisible on another. Cap the pool at a single
    // connection in that case (used by tests and `--database :memory:`) so
    // all callers share the same database.
    // Several pooled connections may hold `BEGIN IMMEDIATE` at once against
    // a shared file; without a busy timeout a concurrent writer gets
    // `SQLITE_BUSY` immediately instead of waiting its turn, which would
    // surface as a spurious SYSTEM_ERROR denial instead of ZONE_FULL.
    let init = |conn: &mut rusqlite::Connection| conn.busy_timeout(std::time::Duration::from_secs(5));
    let (manager, max_size) = if path == ":memory:" {
        (SqliteConnectionManager::memory().with_init(init), 1)
    } else {
        (SqliteConnectionManager::file(path).with_init(init), 16)
    };
    let pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;
    let conn = pool.get()?;
    schema::run_migrations(&conn)?;
    Ok(pool)
}

//! C14 — declarative schema, applied idempotently (B.2).

use crate::error::StoreError;
use sqlx::PgPool;

/// Runs every migration under `migrations/` via `sqlx::migrate!`. Every
/// statement in `0001_init.sql` is `CREATE ... IF NOT EXISTS`, so re-running
/// against an already-migrated database is a no-op — matching the Python
/// original's `migrate.py` being invoked unconditionally before every index
/// run rather than gated on a first-run flag.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

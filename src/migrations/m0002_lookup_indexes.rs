use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_lookup_indexes")
        .depends_on(&["0001_initial_schema"])
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_entries_occurred_at ON entries(occurred_at)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_entries_status ON entries(status)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_audit_log_entry ON audit_log(entry_id)",
        ))
}

use super::{Category, Sample, Table};

pub type PendingId = i64;

/// A sample waiting in the durable queue for a successful replay.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEntry {
    pub id: PendingId,
    pub category: Category,
    pub payload: Sample,
}

#[derive(Clone)]
pub struct PublishQueueTable;

impl Table for PublishQueueTable {
    fn name(&self) -> &'static str {
        "publish_queue"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS publish_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_publish_queue_category ON publish_queue (category, id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS publish_queue;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

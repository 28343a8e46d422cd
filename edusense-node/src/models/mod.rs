mod env_record;
mod pending;
mod radar_record;
mod sample;

pub use env_record::{EnvRecord, EnvRecordTable};
pub use pending::{PendingEntry, PendingId, PublishQueueTable};
pub use radar_record::{RadarRecord, RadarRecordTable};
pub use sample::{
    build_sample, format_timestamp, occupancy_sample, parse_timestamp, wire_fields, Category,
    Sample, RESERVED_KEYS,
};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}

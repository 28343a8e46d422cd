mod pending;
mod sample_record;

pub use pending::PendingRepository;
pub use sample_record::SampleRecordRepository;

pub mod publisher;
pub mod queue;
pub mod radar;
pub mod scheduler;
pub mod sensors;
pub mod transport;

pub use publisher::{BufferedPublisher, PublisherConfig, RetryPolicy};
pub use queue::PersistentQueue;
pub use radar::{RadarScanner, ScanConfig, SweepState};
pub use scheduler::Scheduler;

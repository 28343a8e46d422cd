pub mod node;
pub mod sensor;
pub mod storage;
pub mod transport;

pub use node::NodeError;
pub use sensor::SensorError;
pub use storage::StorageError;
pub use transport::TransportError;

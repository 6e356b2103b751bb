pub mod instance_key;
pub mod striped_executor;

pub use instance_key::InstanceKey;
pub use striped_executor::StripedSerialExecutor;

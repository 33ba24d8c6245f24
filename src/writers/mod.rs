pub mod partition_writer;

pub use partition_writer::{partition_dir, PartitionWriter, WriteOutcome};

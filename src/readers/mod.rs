pub mod grid_reader;
pub mod partition_reader;

pub use grid_reader::GridReader;
pub use partition_reader::{
    list_partitions, partition_info, partition_schema, partitions, read_partition, PartitionInfo,
    PartitionIterator,
};

pub mod common;
pub mod cycles;
pub mod interrupt;
pub mod pagerank;
pub mod paths;

pub use common::{Adjacency, GraphView, NodeId};
pub use cycles::{simple_cycles, CycleSearchConfig};
pub use interrupt::{Interrupt, Interrupted};
pub use pagerank::{page_rank, PageRankConfig};
pub use paths::{simple_paths, PathSearchConfig};

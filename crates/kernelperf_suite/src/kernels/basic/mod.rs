mod init3;
mod reduce_struct;

pub use init3::Init3;
pub use reduce_struct::{PointsSummary, ReduceStruct};

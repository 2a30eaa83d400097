pub mod list;
pub mod op;
pub mod record;
pub mod set;
pub mod wait;

pub use list::OpList;
pub use op::{OpHandle, OpOrigin};
pub use record::FailureRecord;
pub use set::{EventSet, EventSetStats};

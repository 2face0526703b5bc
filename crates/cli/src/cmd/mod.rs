mod order;
mod reduce;

pub use order::cmd_order;
pub use reduce::{Overrides, cmd_reduce};

pub mod shutdown;
pub mod types;
pub mod utills;

pub use shutdown::*;
pub use types::*;
pub use utills::*;

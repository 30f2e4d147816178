pub mod dispatcher;
pub mod driver;
pub mod types;

pub use dispatcher::CommandDispatcher;
pub use driver::PollDriver;
pub use types::{PendingCommand, PollStatus};

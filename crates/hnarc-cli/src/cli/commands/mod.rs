//! CLI command handlers, one file per command.

mod archive;
mod items;
mod pool;
mod users;
mod worker;

pub use archive::{run_retime, run_verify};
pub use items::run_items;
pub use users::run_users;
pub use worker::run_worker;

pub mod config;
pub mod logging;

pub mod archive;
pub mod assemble;
pub mod fetch;
pub mod gate;
pub mod layout;
pub mod partition;
pub mod pipeline;
pub mod pool;
pub mod retry;
pub mod storage;

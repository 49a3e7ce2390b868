mod processes;
pub mod store_path;

pub use processes::cmd_processes;
pub use store_path::cmd_store_path;

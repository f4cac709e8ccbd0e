pub mod cli;
pub mod fetch;
pub mod process;
pub mod store;
pub mod summary;

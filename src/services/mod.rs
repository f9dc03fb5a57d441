pub mod git;
pub mod notify;
pub mod storage;
pub mod store;
pub mod table;

pub mod quotes;
pub mod responses;
pub mod storage;

pub mod asset;
pub mod catalog;
pub mod dispatch;
pub mod job;
pub mod tryon;

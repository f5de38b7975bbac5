pub mod access;
pub mod email;
pub mod notifier;
pub mod storage;

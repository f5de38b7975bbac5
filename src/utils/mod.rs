pub mod format;
pub mod links;

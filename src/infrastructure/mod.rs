pub mod notify;
pub mod staging;

pub mod finalizer;
pub mod recovery;
pub mod usage;

pub mod conflict;
pub mod paths;
pub mod registry;
pub mod wire;

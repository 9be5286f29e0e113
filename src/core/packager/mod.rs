pub mod build;
pub mod env;
pub mod gadget;
pub mod patch;
pub mod tools;
pub mod verify;
pub mod workspace;

pub use build::build;
pub use env::RepackEnv;
pub use gadget::GadgetMode;

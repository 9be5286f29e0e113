pub mod manifest;
pub mod resources;
pub mod xml;

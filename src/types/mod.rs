pub mod geo;
pub mod selection;
pub mod setup;

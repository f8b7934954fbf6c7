pub mod data;
pub mod error;
pub mod memory;
pub mod opener;
pub mod setup_dataset;
pub mod zarr;

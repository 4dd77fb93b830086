pub mod config;
pub mod dataset;
pub mod io;
pub mod overlay;
pub mod system;
pub mod tracking;
pub mod viz;

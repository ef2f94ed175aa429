pub mod assets;
pub mod catalog;
pub mod lifecycle;
pub mod results;
pub mod trigger;

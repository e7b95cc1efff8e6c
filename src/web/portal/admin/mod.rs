pub mod media;
pub mod renters;

pub mod epg_model;

pub use epg_model::*;

//! egui rendering. Views are built in `crate::view`; this module only draws
//! them and turns widget interaction into selection updates.

pub mod pages;
pub mod panels;
pub mod plot;

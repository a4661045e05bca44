//! Interactive host for the particle morph engine.
//!
//! Opens a window, renders the live particle buffer as instanced sprites and
//! turns scroll, keyboard and pointer input into gesture requests.

pub mod app;
pub mod loading;
pub mod nav;
pub mod renderer;
pub mod ui;

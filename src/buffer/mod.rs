// src/buffer/mod.rs
//! Sample storage for the scrolling display window

pub mod sample_window;

pub use sample_window::SampleWindow;

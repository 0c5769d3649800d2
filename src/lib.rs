pub mod app;
pub mod audio;
pub mod camera;
pub mod canvas;
pub mod color;
pub mod config;
pub mod logging;
pub mod params;
pub mod recorder;
pub mod render;
pub mod terminal;
pub mod visual;

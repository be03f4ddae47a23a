mod ball;
mod color;
mod tracker_settings;

pub use ball::*;
pub use color::*;
pub use tracker_settings::*;

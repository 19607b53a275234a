mod demo;
mod health;
mod ws;

pub use demo::*;
pub use health::*;
pub use ws::*;

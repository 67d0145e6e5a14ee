//! Configuration parsing and types.
//!
//! - `types` - resolved config (`Config`, `ServiceConfig`, ...) and the raw file shape
//! - `duration` - human-readable durations
//! - `parser` - locating and parsing `devctl.yaml`
//! - `validation` - `Config::validate`

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;

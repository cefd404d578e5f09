pub mod calibration;
pub mod command_executor;
pub mod config;
pub mod console;
pub mod controller;
pub mod driver;
pub mod error;
pub mod http;
pub mod logging;

pub use calibration::{CalibrationConstants, LinearityRange, ServoPosition};
pub use controller::{AttenuatorController, ControllerSettings};
pub use error::{ControllerError, ValidationError};

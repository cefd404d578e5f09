use maestro::MaestroError;
use utilities::command_executor::ExecutorError;

use crate::calibration::ServoPosition;

pub mod maestro_driver;
#[cfg(test)]
pub(crate) mod mock;

pub use maestro_driver::{MaestroDriver, resolve_port_path};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Servo controller error: {0}")]
    Maestro(#[from] MaestroError),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Narrow capability the controller needs from a servo controller.
/// Each call is addressed by the servo channel (device index).
pub trait ServoDriver: Send + 'static {
    fn set_target_position(
        &mut self,
        device_index: u8,
        position: ServoPosition,
    ) -> Result<(), DriverError>;

    fn get_position(&mut self, device_index: u8) -> Result<ServoPosition, DriverError>;

    fn set_speed(&mut self, device_index: u8, speed: u16) -> Result<(), DriverError>;

    fn set_acceleration(&mut self, device_index: u8, acceleration: u16) -> Result<(), DriverError>;
}

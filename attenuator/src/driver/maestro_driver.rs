use std::time::Duration;

use maestro::{MAX_TARGET, Maestro, MaestroError};
use serialport::SerialPort;

use crate::{
    calibration::ServoPosition,
    config::SerialConfig,
    driver::{DriverError, ServoDriver},
};

/// Maps the `--port` argument to a serial device path. A bare number selects
/// the platform's numbered port, anything else is taken as a path.
pub fn resolve_port_path(config: &SerialConfig, port: Option<&str>) -> String {
    match port {
        None => config.path.clone(),
        Some(port) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            if cfg!(windows) {
                format!("COM{port}")
            } else {
                format!("/dev/ttyACM{port}")
            }
        }
        Some(path) => path.to_string(),
    }
}

pub struct MaestroDriver {
    port: Box<dyn SerialPort>,
    maestro: Maestro,
}

impl MaestroDriver {
    pub fn open(config: &SerialConfig, port: Option<&str>) -> Result<Self, DriverError> {
        let path = resolve_port_path(config, port);

        let port = serialport::new(&path, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()?;

        tracing::info!("Opened servo controller on {}", path);

        Ok(Self {
            port,
            maestro: Maestro::new(config.device_number),
        })
    }
}

impl ServoDriver for MaestroDriver {
    fn set_target_position(
        &mut self,
        device_index: u8,
        position: ServoPosition,
    ) -> Result<(), DriverError> {
        let target = u16::try_from(position).map_err(|_| MaestroError::TargetOutOfRange {
            value: position,
            max: MAX_TARGET,
        })?;

        self.maestro.set_target(&mut self.port, device_index, target)?;
        Ok(())
    }

    fn get_position(&mut self, device_index: u8) -> Result<ServoPosition, DriverError> {
        let position = self.maestro.get_position(&mut self.port, device_index)?;
        Ok(ServoPosition::from(position))
    }

    fn set_speed(&mut self, device_index: u8, speed: u16) -> Result<(), DriverError> {
        self.maestro.set_speed(&mut self.port, device_index, speed)?;
        Ok(())
    }

    fn set_acceleration(&mut self, device_index: u8, acceleration: u16) -> Result<(), DriverError> {
        self.maestro
            .set_acceleration(&mut self.port, device_index, acceleration)?;
        Ok(())
    }
}

use tokio::task::JoinHandle;
use tracing::instrument;
use utilities::command_executor::ExecutorError;

use crate::{
    calibration::{
        CalibrationConstants, LinearityRange, NEAR_ZERO_SERVO_POSITION, ServoPosition,
        attenuation_from_servo, servo_from_attenuation,
    },
    command_executor::{ServoHandler, command_sender::ServoCommandSender, create_servo_executor},
    config::AttenuatorConfig,
    driver::{DriverError, MaestroDriver, ServoDriver},
    error::{ControllerError, ValidationError},
};

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub device_index: u8,
    pub speed: u16,
    pub acceleration: u16,
    pub near_zero_position: ServoPosition,
    pub calibration: CalibrationConstants,
    pub linearity_range: LinearityRange,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            speed: 5,
            acceleration: 1,
            near_zero_position: NEAR_ZERO_SERVO_POSITION,
            calibration: CalibrationConstants::default(),
            linearity_range: LinearityRange::calibrated(),
        }
    }
}

impl From<&AttenuatorConfig> for ControllerSettings {
    fn from(config: &AttenuatorConfig) -> Self {
        Self {
            device_index: config.servo.device_index,
            speed: config.servo.speed,
            acceleration: config.servo.acceleration,
            near_zero_position: config.servo.near_zero_position,
            calibration: config.calibration,
            linearity_range: config.linearity_range,
        }
    }
}

/// Single entry point to the attenuator hardware.
///
/// The driver lives on a dedicated executor thread and every operation is one
/// command on that thread, so calls from any number of front ends reach the
/// device strictly one after another. No attenuation state is cached here.
pub struct AttenuatorController {
    servo: ServoCommandSender,
    executor: JoinHandle<ServoHandler>,
    settings: ControllerSettings,
}

impl AttenuatorController {
    /// Opens the serial device named by `port` (or the configured path).
    pub fn connect(
        config: &AttenuatorConfig,
        port: Option<&str>,
        linearity_range: LinearityRange,
    ) -> Result<Self, ControllerError> {
        let driver =
            MaestroDriver::open(&config.serial, port).map_err(ControllerError::Construction)?;

        let settings = ControllerSettings {
            linearity_range,
            ..ControllerSettings::from(config)
        };

        Self::start(driver, settings)
    }

    /// Applies the motion profile and hands the driver to the executor.
    /// Must be called from within a tokio runtime.
    pub fn start<D: ServoDriver>(
        mut driver: D,
        settings: ControllerSettings,
    ) -> Result<Self, ControllerError> {
        if !settings.calibration.is_invertible() {
            return Err(ValidationError::NonInvertibleCalibration {
                slope: settings.calibration.slope,
            }
            .into());
        }

        let configure = |driver: &mut D| -> Result<(), DriverError> {
            driver.set_speed(settings.device_index, settings.speed)?;
            driver.set_acceleration(settings.device_index, settings.acceleration)
        };
        configure(&mut driver).map_err(ControllerError::Construction)?;

        let (executor, servo) = create_servo_executor(Box::new(driver));
        let executor = executor.spawn();

        tracing::info!(
            device_index = settings.device_index,
            speed = settings.speed,
            acceleration = settings.acceleration,
            "Servo controller ready"
        );

        Ok(Self {
            servo,
            executor,
            settings,
        })
    }

    /// Resolves the servo position for a requested attenuation without
    /// touching the device.
    ///
    /// Exactly zero maps to the configured near-zero position. Anything else
    /// must lie inside the active linearity range.
    pub fn target_for(&self, attenuation_percent: f64) -> Result<ServoPosition, ValidationError> {
        if attenuation_percent == 0.0 {
            return Ok(self.settings.near_zero_position);
        }

        let range = &self.settings.linearity_range;
        if !range.contains(attenuation_percent) {
            return Err(ValidationError::OutOfLinearityRange {
                value: attenuation_percent,
                min: range.min_percent,
                max: range.max_percent,
            });
        }

        Ok(servo_from_attenuation(
            attenuation_percent,
            &self.settings.calibration,
        ))
    }

    /// Returns the servo position that was commanded.
    #[instrument(skip(self))]
    pub async fn set_attenuation(
        &self,
        attenuation_percent: f64,
    ) -> Result<ServoPosition, ControllerError> {
        let position = self.target_for(attenuation_percent)?;

        self.servo
            .set_target(self.settings.device_index, position)
            .await?;

        tracing::debug!(position, "Attenuation target sent");
        Ok(position)
    }

    /// Current attenuation as a 0-1 fraction.
    #[instrument(skip(self))]
    pub async fn get_attenuation(&self) -> Result<f64, ControllerError> {
        let position = self.get_servo_position().await?;
        Ok(attenuation_from_servo(position, &self.settings.calibration))
    }

    #[instrument(skip(self))]
    pub async fn set_servo_position(&self, position: ServoPosition) -> Result<(), ControllerError> {
        self.servo
            .set_target(self.settings.device_index, position)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_servo_position(&self) -> Result<ServoPosition, ControllerError> {
        Ok(self.servo.get_position(self.settings.device_index).await?)
    }

    /// Stops the executor and releases the device.
    pub async fn close(self) -> Result<(), ControllerError> {
        let Self { servo, executor, .. } = self;
        drop(servo);

        executor
            .await
            .map_err(|_| DriverError::from(ExecutorError::Panicked))?;

        tracing::info!("Servo controller closed");
        Ok(())
    }
}

use crate::driver::DriverError;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Attenuation {value}% is outside linearity range [{min}, {max}]")]
    OutOfLinearityRange { value: f64, min: f64, max: f64 },

    #[error("Calibration slope {slope} cannot be inverted")]
    NonInvertibleCalibration { slope: f64 },

    #[error("Usage: {0}")]
    Usage(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The device could not be opened or configured. Fatal at startup.
    #[error("Failed to initialize servo controller: {0}")]
    Construction(#[source] DriverError),

    #[error("Servo communication failed: {0}")]
    Communication(#[from] DriverError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

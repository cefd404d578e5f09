use bitflags::bitflags;
use std::io::{Read, Write};

const POLOLU_PREFIX: u8 = 0xAA;

const CMD_SET_TARGET: u8 = 0x84;
const CMD_SET_SPEED: u8 = 0x87;
const CMD_SET_ACCELERATION: u8 = 0x89;
const CMD_GET_POSITION: u8 = 0x90;
const CMD_GET_MOVING_STATE: u8 = 0x93;
const CMD_GET_ERRORS: u8 = 0xA1;
const CMD_GO_HOME: u8 = 0xA2;

pub const DEFAULT_DEVICE_NUMBER: u8 = 0x0C;

/// Largest value representable by the 14-bit target/speed encoding.
pub const MAX_TARGET: u16 = 0x3FFF;
pub const MAX_ACCELERATION: u16 = 255;
pub const MAX_CHANNEL: u8 = 23;

#[derive(Debug, thiserror::Error)]
pub enum MaestroError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Value {value} is out of range (max {max})")]
    TargetOutOfRange { value: i32, max: u16 },

    #[error("Invalid channel {0}")]
    InvalidChannel(u8),
}

impl From<MaestroError> for std::io::Error {
    fn from(error: MaestroError) -> Self {
        match error {
            MaestroError::Io(error) => error,
            _ => std::io::Error::new(std::io::ErrorKind::InvalidInput, error.to_string()),
        }
    }
}

bitflags!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorFlags: u16 {
        const SERIAL_SIGNAL = 1 << 0;
        const SERIAL_OVERRUN = 1 << 1;
        const SERIAL_RX_BUFFER_FULL = 1 << 2;
        const SERIAL_CRC = 1 << 3;
        const SERIAL_PROTOCOL = 1 << 4;
        const SERIAL_TIMEOUT = 1 << 5;
        const SCRIPT_STACK = 1 << 6;
        const SCRIPT_CALL_STACK = 1 << 7;
        const SCRIPT_PROGRAM_COUNTER = 1 << 8;
    }
);

/// Pololu Maestro servo controller speaking the Pololu serial protocol.
///
/// Positions and targets are in quarter-microseconds of pulse width.
#[derive(Debug, Clone, Copy)]
pub struct Maestro {
    device_number: u8,
}

impl Default for Maestro {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_NUMBER)
    }
}

impl Maestro {
    pub fn new(device_number: u8) -> Self {
        Self { device_number }
    }

    pub fn device_number(&self) -> u8 {
        self.device_number
    }

    fn frame(&self, command: u8, data: &[u8]) -> Vec<u8> {
        let mut request = vec![POLOLU_PREFIX, self.device_number, command & 0x7F];
        request.extend_from_slice(data);
        request
    }

    fn send(
        &self,
        client: &mut (impl Write + Read),
        command: u8,
        data: &[u8],
    ) -> Result<(), MaestroError> {
        let request = self.frame(command, data);
        client.write_all(&request)?;
        client.flush()?;
        Ok(())
    }

    fn read_u16(&self, client: &mut (impl Write + Read)) -> Result<u16, MaestroError> {
        let mut response = [0u8; 2];
        client.read_exact(&mut response)?;
        Ok(u16::from_le_bytes(response))
    }

    fn check_channel(channel: u8) -> Result<(), MaestroError> {
        if channel > MAX_CHANNEL {
            return Err(MaestroError::InvalidChannel(channel));
        }
        Ok(())
    }

    fn encode_14bit(value: u16, max: u16) -> Result<[u8; 2], MaestroError> {
        if value > max {
            return Err(MaestroError::TargetOutOfRange {
                value: i32::from(value),
                max,
            });
        }
        Ok([(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8])
    }

    pub fn set_target(
        &self,
        client: &mut (impl Write + Read),
        channel: u8,
        target: u16,
    ) -> Result<(), MaestroError> {
        Self::check_channel(channel)?;
        let [low, high] = Self::encode_14bit(target, MAX_TARGET)?;
        self.send(client, CMD_SET_TARGET, &[channel, low, high])
    }

    /// Speed limit in units of 0.25 us / 10 ms. Zero means unlimited.
    pub fn set_speed(
        &self,
        client: &mut (impl Write + Read),
        channel: u8,
        speed: u16,
    ) -> Result<(), MaestroError> {
        Self::check_channel(channel)?;
        let [low, high] = Self::encode_14bit(speed, MAX_TARGET)?;
        self.send(client, CMD_SET_SPEED, &[channel, low, high])
    }

    /// Acceleration limit in units of 0.25 us / 10 ms / 80 ms. Zero means unlimited.
    pub fn set_acceleration(
        &self,
        client: &mut (impl Write + Read),
        channel: u8,
        acceleration: u16,
    ) -> Result<(), MaestroError> {
        Self::check_channel(channel)?;
        let [low, high] = Self::encode_14bit(acceleration, MAX_ACCELERATION)?;
        self.send(client, CMD_SET_ACCELERATION, &[channel, low, high])
    }

    pub fn get_position(
        &self,
        client: &mut (impl Write + Read),
        channel: u8,
    ) -> Result<u16, MaestroError> {
        Self::check_channel(channel)?;
        self.send(client, CMD_GET_POSITION, &[channel])?;
        self.read_u16(client)
    }

    pub fn get_moving_state(&self, client: &mut (impl Write + Read)) -> Result<bool, MaestroError> {
        self.send(client, CMD_GET_MOVING_STATE, &[])?;
        let mut response = [0u8; 1];
        client.read_exact(&mut response)?;
        Ok(response[0] != 0)
    }

    /// Reads and clears the device error register.
    pub fn get_errors(&self, client: &mut (impl Write + Read)) -> Result<ErrorFlags, MaestroError> {
        self.send(client, CMD_GET_ERRORS, &[])?;
        let errors = self.read_u16(client)?;
        Ok(ErrorFlags::from_bits_truncate(errors))
    }

    pub fn go_home(&self, client: &mut (impl Write + Read)) -> Result<(), MaestroError> {
        self.send(client, CMD_GO_HOME, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    struct MockPort {
        written: Vec<u8>,
        reply: Cursor<Vec<u8>>,
    }

    impl MockPort {
        fn new(reply: &[u8]) -> Self {
            Self {
                written: Vec::new(),
                reply: Cursor::new(reply.to_vec()),
            }
        }
    }

    impl Read for MockPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reply.read(buf)
        }
    }

    impl Write for MockPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn set_target_splits_into_7bit_bytes() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[]);

        maestro.set_target(&mut port, 0, 6000).unwrap();

        // 6000 = 0b101110_1110000
        assert_eq!(port.written, vec![0xAA, 0x0C, 0x04, 0x00, 0x70, 0x2E]);
    }

    #[test]
    fn set_target_rejects_values_above_14_bits() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[]);

        let err = maestro.set_target(&mut port, 0, 0x4000).unwrap_err();

        assert!(matches!(
            err,
            MaestroError::TargetOutOfRange { value: 0x4000, .. }
        ));
        assert!(port.written.is_empty());
    }

    #[test]
    fn speed_and_acceleration_use_their_own_commands() {
        let maestro = Maestro::new(1);
        let mut port = MockPort::new(&[]);

        maestro.set_speed(&mut port, 2, 5).unwrap();
        maestro.set_acceleration(&mut port, 2, 1).unwrap();

        assert_eq!(
            port.written,
            vec![0xAA, 0x01, 0x07, 0x02, 0x05, 0x00, 0xAA, 0x01, 0x09, 0x02, 0x01, 0x00]
        );
        assert!(maestro.set_acceleration(&mut port, 2, 256).is_err());
    }

    #[test]
    fn get_position_reads_little_endian_reply() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[0xEC, 0x13]);

        let position = maestro.get_position(&mut port, 3).unwrap();

        assert_eq!(position, 5100);
        assert_eq!(port.written, vec![0xAA, 0x0C, 0x10, 0x03]);
    }

    #[test]
    fn short_reply_is_an_io_error() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[0x01]);

        let err = maestro.get_position(&mut port, 0).unwrap_err();

        match err {
            MaestroError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_channel_is_rejected_before_writing() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[]);

        assert!(matches!(
            maestro.get_position(&mut port, 24),
            Err(MaestroError::InvalidChannel(24))
        ));
        assert!(port.written.is_empty());
    }

    #[test]
    fn error_register_is_decoded() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[0x11, 0x01]);

        let errors = maestro.get_errors(&mut port).unwrap();

        assert_eq!(
            errors,
            ErrorFlags::SERIAL_SIGNAL | ErrorFlags::SERIAL_PROTOCOL | ErrorFlags::SCRIPT_PROGRAM_COUNTER
        );
    }

    #[test]
    fn moving_state_and_go_home() {
        let maestro = Maestro::default();
        let mut port = MockPort::new(&[0x01]);

        assert!(maestro.get_moving_state(&mut port).unwrap());
        maestro.go_home(&mut port).unwrap();

        assert_eq!(port.written, vec![0xAA, 0x0C, 0x13, 0xAA, 0x0C, 0x22]);
    }
}

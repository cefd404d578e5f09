use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use maestro::MaestroError;

use crate::{
    calibration::ServoPosition,
    driver::{DriverError, ServoDriver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    SetTarget(u8, ServoPosition),
    GetPosition(u8),
    SetSpeed(u8, u16),
    SetAcceleration(u8, u16),
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<DriverCall>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_configuration: AtomicBool,
    in_call: AtomicBool,
    overlaps: AtomicUsize,
}

/// Recording servo driver. Clones observe the same call log.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    shared: Arc<Shared>,
    position: ServoPosition,
    call_delay: Option<Duration>,
}

fn broken_pipe() -> DriverError {
    DriverError::Maestro(MaestroError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "servo controller disconnected",
    )))
}

impl RecordingDriver {
    pub fn with_position(position: ServoPosition) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Every call sleeps while holding the re-entrancy flag.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn failing_writes(self) -> Self {
        self.shared.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_reads(self) -> Self {
        self.shared.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_configuration(self) -> Self {
        self.shared.fail_configuration.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn target_calls(&self) -> Vec<DriverCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, DriverCall::SetTarget(..)))
            .collect()
    }

    pub fn overlapping_calls(&self) -> usize {
        self.shared.overlaps.load(Ordering::SeqCst)
    }

    fn record(&self, call: DriverCall) {
        if self.shared.in_call.swap(true, Ordering::SeqCst) {
            self.shared.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        self.shared.calls.lock().unwrap().push(call);
        if let Some(delay) = self.call_delay {
            std::thread::sleep(delay);
        }

        self.shared.in_call.store(false, Ordering::SeqCst);
    }
}

impl ServoDriver for RecordingDriver {
    fn set_target_position(
        &mut self,
        device_index: u8,
        position: ServoPosition,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::SetTarget(device_index, position));
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(broken_pipe());
        }
        self.position = position;
        Ok(())
    }

    fn get_position(&mut self, device_index: u8) -> Result<ServoPosition, DriverError> {
        self.record(DriverCall::GetPosition(device_index));
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(broken_pipe());
        }
        Ok(self.position)
    }

    fn set_speed(&mut self, device_index: u8, speed: u16) -> Result<(), DriverError> {
        self.record(DriverCall::SetSpeed(device_index, speed));
        if self.shared.fail_configuration.load(Ordering::SeqCst) {
            return Err(broken_pipe());
        }
        Ok(())
    }

    fn set_acceleration(&mut self, device_index: u8, acceleration: u16) -> Result<(), DriverError> {
        self.record(DriverCall::SetAcceleration(device_index, acceleration));
        if self.shared.fail_configuration.load(Ordering::SeqCst) {
            return Err(broken_pipe());
        }
        Ok(())
    }
}

use std::io;

use utilities::command_executor::CommandSender;

use crate::{
    calibration::ServoPosition,
    command_executor::commands::{ServoCommand, ServoResponse},
    driver::DriverError,
};

#[derive(Clone)]
pub struct ServoCommandSender {
    sender: CommandSender<ServoCommand>,
}

fn unexpected_response() -> DriverError {
    DriverError::Maestro(
        io::Error::new(io::ErrorKind::InvalidData, "Unexpected response type").into(),
    )
}

impl ServoCommandSender {
    pub fn new(sender: CommandSender<ServoCommand>) -> Self {
        Self { sender }
    }

    pub async fn set_target(
        &self,
        device_index: u8,
        position: ServoPosition,
    ) -> Result<(), DriverError> {
        let response = self
            .sender
            .send_command(ServoCommand::SetTarget {
                device_index,
                position,
            })
            .await?;

        match response {
            ServoResponse::Ok => Ok(()),
            _ => Err(unexpected_response()),
        }
    }

    pub async fn get_position(&self, device_index: u8) -> Result<ServoPosition, DriverError> {
        let response = self
            .sender
            .send_command(ServoCommand::GetPosition { device_index })
            .await?;

        match response {
            ServoResponse::Position(position) => Ok(position),
            _ => Err(unexpected_response()),
        }
    }
}

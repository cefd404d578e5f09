use utilities::command_executor::Command;

use crate::{calibration::ServoPosition, command_executor::ServoHandler, driver::DriverError};

pub enum ServoCommand {
    SetTarget {
        device_index: u8,
        position: ServoPosition,
    },
    GetPosition {
        device_index: u8,
    },
}

pub enum ServoResponse {
    Ok,
    Position(ServoPosition),
}

impl Command for ServoCommand {
    type Response = ServoResponse;
    type Error = DriverError;
    type Handler = ServoHandler;

    fn execute(self, handler: &mut ServoHandler) -> Result<ServoResponse, DriverError> {
        match self {
            ServoCommand::SetTarget {
                device_index,
                position,
            } => {
                handler
                    .driver()
                    .set_target_position(device_index, position)?;
                Ok(ServoResponse::Ok)
            }
            ServoCommand::GetPosition { device_index } => handler
                .driver()
                .get_position(device_index)
                .map(ServoResponse::Position),
        }
    }
}

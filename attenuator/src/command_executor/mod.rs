use utilities::command_executor::{CommandExecutor, DeviceHandler};

use crate::{
    command_executor::{command_sender::ServoCommandSender, commands::ServoCommand},
    driver::ServoDriver,
};

pub mod command_sender;
pub mod commands;

/// Sole owner of the servo driver once the controller is running.
pub struct ServoHandler {
    driver: Box<dyn ServoDriver>,
}

impl ServoHandler {
    pub fn new(driver: Box<dyn ServoDriver>) -> Self {
        Self { driver }
    }

    pub(crate) fn driver(&mut self) -> &mut dyn ServoDriver {
        self.driver.as_mut()
    }
}

impl DeviceHandler for ServoHandler {
    type Command = ServoCommand;
}

pub fn create_servo_executor(
    driver: Box<dyn ServoDriver>,
) -> (CommandExecutor<ServoHandler>, ServoCommandSender) {
    let executor = CommandExecutor::new(ServoHandler::new(driver));
    let sender = ServoCommandSender::new(executor.sender());

    (executor, sender)
}

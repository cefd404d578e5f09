//! Interactive prompt over the attenuator controller.

use std::{future::Future, io::Write, sync::Arc};

use tokio::sync::mpsc;

use crate::{
    calibration::ServoPosition,
    controller::AttenuatorController,
    error::{ControllerError, ValidationError},
};

pub const PROMPT: &str = ">>> ";
pub const COMMAND_LIST: &str = "set get set-servo get-servo quit";

const SET_USAGE: &str = "set [attenuation]";
const SET_SERVO_USAGE: &str = "set-servo [position]";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Set(f64),
    Get,
    SetServo(ServoPosition),
    GetServo,
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, ValidationError> {
    let mut words = line.split_whitespace();

    let command = match words.next() {
        Some("set") => {
            let value = words
                .next()
                .and_then(|word| word.parse::<f64>().ok())
                .ok_or(ValidationError::Usage(SET_USAGE))?;
            ConsoleCommand::Set(value)
        }
        Some("get") => ConsoleCommand::Get,
        Some("set-servo") => {
            let position = words
                .next()
                .and_then(|word| word.parse::<ServoPosition>().ok())
                .ok_or(ValidationError::Usage(SET_SERVO_USAGE))?;
            ConsoleCommand::SetServo(position)
        }
        Some("get-servo") => ConsoleCommand::GetServo,
        Some("quit") => ConsoleCommand::Quit,
        _ => ConsoleCommand::Help,
    };

    Ok(command)
}

/// Reads stdin on a plain thread so a pending read never holds up runtime
/// shutdown. The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    rx
}

pub struct Console<W: Write> {
    controller: Arc<AttenuatorController>,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(controller: Arc<AttenuatorController>, out: W) -> Self {
        Self { controller, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Runs until `quit`, end of input or Ctrl-C. Controller failures are
    /// reported and the loop continues.
    pub async fn run(&mut self, input: mpsc::Receiver<String>) -> std::io::Result<()> {
        self.run_until(input, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Like [`Console::run`], with `interrupt` in place of Ctrl-C. The
    /// interrupt is watched for the whole session, including while a command
    /// is waiting on the device.
    pub async fn run_until(
        &mut self,
        mut input: mpsc::Receiver<String>,
        interrupt: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        tokio::pin!(interrupt);

        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let line = tokio::select! {
                line = input.recv() => line,
                _ = &mut interrupt => None,
            };

            let Some(line) = line else {
                break;
            };

            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    writeln!(self.out, "{e}")?;
                    continue;
                }
            };

            if command == ConsoleCommand::Quit {
                break;
            }

            let result = tokio::select! {
                result = self.execute(command) => result,
                _ = &mut interrupt => break,
            };

            if let Err(e) = result {
                self.report(e)?;
            }
        }

        writeln!(self.out)?;
        self.out.flush()
    }

    async fn execute(&mut self, command: ConsoleCommand) -> Result<(), ControllerError> {
        match command {
            ConsoleCommand::Set(value) => {
                self.controller.set_attenuation(value).await?;
            }
            ConsoleCommand::Get => {
                let attenuation = self.controller.get_attenuation().await?;
                self.print(format_args!("{:.2}%", attenuation * 100.0));
            }
            ConsoleCommand::SetServo(position) => {
                self.controller.set_servo_position(position).await?;
            }
            ConsoleCommand::GetServo => {
                let position = self.controller.get_servo_position().await?;
                self.print(format_args!("{position}"));
            }
            ConsoleCommand::Help => {
                self.print(format_args!("Commands: {COMMAND_LIST}"));
            }
            ConsoleCommand::Quit => {}
        }

        Ok(())
    }

    fn print(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{args}") {
            tracing::warn!("Failed to write console output: {}", e);
        }
    }

    fn report(&mut self, error: ControllerError) -> std::io::Result<()> {
        match error {
            ControllerError::Validation(ValidationError::OutOfLinearityRange { .. }) => {
                writeln!(self.out, "Error: attenuation value outside linearity range")
            }
            ControllerError::Validation(e) => writeln!(self.out, "{e}"),
            e => {
                tracing::error!("{}", e);
                writeln!(self.out, "Error: {e}")
            }
        }
    }
}

use std::{
    fmt::Display,
    sync::mpsc::{Receiver, Sender},
};

use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Device executor is not running")]
    Stopped,

    #[error("Device executor dropped the response")]
    ResponseDropped,

    #[error("Device executor panicked")]
    Panicked,
}

pub trait Command: Send {
    type Response: Send;
    type Error: From<ExecutorError> + Display + Send;
    type Handler: DeviceHandler<Command = Self>;

    fn execute(self, handler: &mut Self::Handler) -> Result<Self::Response, Self::Error>;
}

pub trait DeviceHandler {
    type Command: Command<Handler = Self>;
}

type CommandResult<C> = Result<<C as Command>::Response, <C as Command>::Error>;

pub struct GenericCommand<C: Command> {
    command: C,
    response_ch: oneshot::Sender<CommandResult<C>>,
}

impl<C: Command> GenericCommand<C> {
    pub fn new(command: C, response_ch: oneshot::Sender<CommandResult<C>>) -> Self {
        Self {
            command,
            response_ch,
        }
    }

    pub fn execute(self, handler: &mut C::Handler) -> Result<(), ExecutorError> {
        let result = self.command.execute(handler);

        self.response_ch
            .send(result)
            .map_err(|_| ExecutorError::ResponseDropped)
    }
}

/// Owns a device handler and runs its commands one at a time on a blocking
/// thread. The handler is never touched from anywhere else.
pub struct CommandExecutor<H: DeviceHandler + Send + 'static> {
    handler: H,
    commands_ch: Receiver<GenericCommand<H::Command>>,
    sender: Sender<GenericCommand<H::Command>>,
}

impl<H: DeviceHandler + Send + 'static> CommandExecutor<H> {
    pub fn new(handler: H) -> Self {
        let (sender, commands_ch) = std::sync::mpsc::channel();

        Self {
            handler,
            commands_ch,
            sender,
        }
    }

    pub fn sender(&self) -> CommandSender<H::Command> {
        CommandSender::new(self.sender.clone())
    }

    /// Executes commands until every `CommandSender` is dropped, then hands
    /// the handler back.
    pub fn run(self) -> H {
        let Self {
            mut handler,
            commands_ch,
            sender,
        } = self;
        drop(sender);

        while let Ok(command) = commands_ch.recv() {
            if let Err(e) = command.execute(&mut handler) {
                tracing::debug!("Response not delivered: {}", e);
            }
        }

        handler
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<H>
    where
        GenericCommand<H::Command>: Send,
    {
        tokio::task::spawn_blocking(move || self.run())
    }
}

pub struct CommandSender<C: Command> {
    commands_ch: Sender<GenericCommand<C>>,
}

impl<C: Command> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            commands_ch: self.commands_ch.clone(),
        }
    }
}

impl<C: Command> CommandSender<C> {
    pub fn new(commands_ch: Sender<GenericCommand<C>>) -> Self {
        Self { commands_ch }
    }

    pub async fn send_command(&self, command: C) -> Result<C::Response, C::Error> {
        let (response_ch, response_rx) = oneshot::channel();
        let command = GenericCommand::new(command, response_ch);

        self.commands_ch
            .send(command)
            .map_err(|_| ExecutorError::Stopped)?;

        response_rx
            .await
            .map_err(|_| ExecutorError::ResponseDropped)?
    }
}

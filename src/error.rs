use thiserror::Error;

use crate::event::event_bus::EventError;
use crate::event::event_waiter::{WaitError, WaiterBuilderError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Wait error: {0}")]
    Wait(#[from] WaitError),
    // event bus
    #[error("Event error: {0}")]
    Event(#[from] EventError),
    #[error("Builder error: {0}")]
    Builder(#[from] WaiterBuilderError),
    #[error("Config error: {0}")]
    Config(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}

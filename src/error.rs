use thiserror::Error;

use crate::bound_handler::BindError;
use crate::subscriber::HandlerError;

#[derive(Error, Debug)]
pub enum Error {
    // handler invocation failure during dispatch
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
    // handler binding failure at registration
    #[error("Bind error: {0}")]
    Bind(#[from] BindError),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}

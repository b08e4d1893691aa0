use thiserror::Error;

use crate::export::ExportError;
use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum SotinError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("A request is already in progress for this session")]
    RequestInProgress,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod gateway;
pub mod models;
pub mod session;

pub use config::{DocumentLayout, ExportConfig, GatewayConfig, SotinConfig};
pub use controller::{ControllerState, ConversationController, Exchange};
pub use error::SotinError;
pub use export::{ExportCapabilities, ExportError, ExportFormat, ExportPipeline};
pub use gateway::{Gateway, GatewayError, GatewayReply, HttpGateway};
pub use models::{Citation, RawCitation, Role, Turn};
pub use session::{
    IdGenerator, SequentialIdGenerator, SessionSnapshot, SessionStore, UuidGenerator,
};

//! ClipTalk server: listener WebSocket, audio streaming, text intake

pub mod audio_stream;
pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod intake;
pub mod messages;
pub mod pipeline;
pub mod session;
pub mod supervisor;
pub mod websocket;

pub use config::ClipTalkConfig;
pub use error::{Result, ServerError};
pub use http::{create_router, AppState};
pub use messages::{ClientMessage, ServerEvent};
pub use pipeline::Pipeline;
pub use session::{ListenerHandle, Session};

//! Gateway proxy, function handler, backend client and design workflow for
//! roomcraft. Everything is synchronous; async callers wrap `FunctionHandler`
//! in a blocking task.

pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod handler;
pub mod media;
pub mod providers;
pub mod transport;
pub mod workflow;

pub use backend::{BackendClient, BackendError, RestDesignStore};
pub use config::{BackendConfig, FallbackConfig, GatewayConfig};
pub use error::{FunctionError, GatewayError};
pub use gateway::{GatewayClient, GeneratedImage, Recommendation};
pub use handler::{FunctionHandler, FunctionRequest, FunctionResponse, RoomFunction};
pub use workflow::{
    load_room_photo, Actor, DesignStudio, FunctionInvoker, GeneratedDesign, LocalFunctions,
    SaveOutcome,
};

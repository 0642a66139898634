mod executor;
mod response;
mod routes;
mod session;

pub mod app;
pub mod config;
pub mod server;
pub mod telemetry;

pub use app::start_app;
pub use executor::{ExecutorError, PipelineExecutor};
pub use response::Responder;
pub use session::{CloseReason, Session, SessionState};

//! Chat automation session for SuperAI.
//!
//! Each component owns one stage of an exchange and reports through an
//! [`Envelope`](superai_core::Envelope); the [`Orchestrator`] strings them
//! together and guarantees the browsing context is released.

pub mod auth;
pub mod harvest;
pub mod maintenance;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod thread;
pub mod transmit;

pub use auth::Authenticator;
pub use harvest::{blob_images, new_replies, ReplyBlock, ResponseHarvester};
pub use maintenance::{ChatMaintenance, MaintenanceStep};
pub use model::ModelSwitcher;
pub use orchestrator::{send_message_and_get_response, Orchestrator};
pub use session::{ChatMode, Session, SessionState};
pub use thread::{ThreadChoice, ThreadSelector};
pub use transmit::MessageTransmitter;

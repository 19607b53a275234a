mod handler;
mod messages;

pub use handler::{handle_client_text, ws_handler, WsState};
pub use messages::ClientMessage;

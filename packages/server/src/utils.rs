pub mod config;
pub mod room_code;
pub mod test_setup;
pub mod websocket;

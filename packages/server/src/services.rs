pub mod action_collector;
pub mod ai;
pub mod broadcaster;
pub mod game_service;
pub mod intent;
pub mod phase_machine;
pub mod resolution;
pub mod room_service;
pub mod snapshot;
pub mod timer;

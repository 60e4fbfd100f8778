pub mod action;
pub mod config;
pub mod event;
pub mod game;
pub mod history;
pub mod player;
pub mod role;
pub mod room;

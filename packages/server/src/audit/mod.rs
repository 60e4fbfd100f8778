pub mod history_hash;

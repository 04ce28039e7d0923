pub mod chat;
pub mod config;
pub mod report;
pub mod score;
pub mod search;
pub mod seed;
pub mod serve;
pub mod status;

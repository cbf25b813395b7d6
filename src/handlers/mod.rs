pub mod commands;
pub mod media;
pub mod relay;
pub mod responses;

pub mod app;
pub mod core;
pub mod events;
pub mod filter;
pub mod patterns;
pub mod repository;
pub mod scanner;

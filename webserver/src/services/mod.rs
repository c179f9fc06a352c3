//! Background services run alongside the HTTP server

pub mod sweeper;

#[cfg(test)]
mod tests;

pub use sweeper::Sweeper;

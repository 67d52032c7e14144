pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod services;

#[cfg(test)]
mod test_support;

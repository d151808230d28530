pub mod analysis;
pub mod config;
pub mod corpus;
pub mod error;
pub mod export;
pub mod fixture;
pub mod fixture_feed;
pub mod http_client;
pub mod logging;
pub mod market;
pub mod matcher;
pub mod narrative;
pub mod outcome;
pub mod score;
pub mod stats;
pub mod synthetic;

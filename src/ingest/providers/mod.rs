pub mod market;
pub mod rss;
pub mod social;

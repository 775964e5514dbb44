pub mod api;

pub use api::{ClientConfig, MediaWikiClient};

//! Lead generation from job-alert emails.
//!
//! Offers are parsed out of alert messages, their pages are scraped for a
//! contact, companies and their leaders are looked up on LinkedIn and the
//! resulting profiles are enriched with contact details. Every step is a
//! stage of the [`pipeline`], run as its own process.

pub mod config;
pub mod crawlers;
pub mod driver;
pub mod enrich;
pub mod export;
pub mod links;
pub mod mail;
pub mod parsers;
pub mod pipeline;
pub mod results;
pub mod stages;
pub mod strategy;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use links::{find_first_url, normalize_linkedin_url, resolve_redirect};
pub use parsers::offers::extract_offers;
pub use results::{LeadRow, OfferRecord};

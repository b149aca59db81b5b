// External API clients
pub mod tiktok;

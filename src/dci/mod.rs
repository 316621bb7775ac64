mod client;

pub use client::{DciClient, DEFAULT_BASE_URL};

//! ai module: classifier, speech-to-text and generative-text clients.
//! External I/O (HTTP, model files, temp WAVs) stays behind this boundary;
//! callers see ports over entities only.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

pub mod asr;
pub mod class_map;
pub mod classifier;
pub mod llm;

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

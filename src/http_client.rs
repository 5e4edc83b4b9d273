use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("fpl_similarity/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client. The timeout only applies to the first call; `None`
/// keeps reqwest's own default.
pub fn http_client(timeout: Option<Duration>) -> Result<&'static Client, FetchError> {
    CLIENT.get_or_try_init(|| {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(FetchError::Client)
    })
}

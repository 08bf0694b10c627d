use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::Result;
use crate::model::PeopleListing;
use crate::model::Person;

pub const DEFAULT_BASE_URL: &str = "https://swapi.dev/api/people";

/// HTTP access to the people endpoints of a SWAPI-compatible server.
#[derive(Debug, Clone)]
pub struct SwapiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl SwapiClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        SwapiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// Reads the total number of people from the root listing.
    pub async fn fetch_count(&self) -> Result<i64> {
        let url = format!("{}/", self.base_url);
        debug!(%url, "fetching people count");

        let listing = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<PeopleListing>()
            .await?;

        Ok(listing.count)
    }

    /// Fetches one person. A 404 is absence, not an error.
    pub async fn fetch_person(&self, person_id: i64) -> Result<Option<Person>> {
        let url = format!("{}/{}", self.base_url, person_id);

        let response = self.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(person_id, "person not found");
            return Ok(None);
        }

        let mut person = response.error_for_status()?.json::<Person>().await?;
        person.id = person_id;

        Ok(Some(person))
    }
}

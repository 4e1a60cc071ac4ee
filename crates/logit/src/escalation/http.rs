use super::{CrashReport, CrashReporter};
use crate::error::EscalationError;
use std::{sync::OnceLock, time::Duration};
use url::Url;

/// Posts every report as JSON to an HTTP endpoint, authenticating with the
/// project key as the basic-auth user.
pub struct HttpCrashReporter {
    endpoint: Url,
    key: Option<String>,
    timeout: Duration,
    // built on first use, off the caller's thread
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpCrashReporter {
    pub fn new(endpoint: Url, key: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint,
            key,
            timeout,
            client: OnceLock::new(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, EscalationError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;

        Ok(self.client.get_or_init(|| client))
    }
}

impl CrashReporter for HttpCrashReporter {
    fn report(&self, report: &CrashReport) -> Result<(), EscalationError> {
        let mut request = self.client()?.post(self.endpoint.clone()).json(report);

        if let Some(key) = &self.key {
            request = request.basic_auth(key, None::<&str>);
        }

        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(EscalationError::Status(status.as_u16()));
        }

        Ok(())
    }
}

impl std::fmt::Debug for HttpCrashReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCrashReporter")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

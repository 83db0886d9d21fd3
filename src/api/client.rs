use std::time::Duration;

/// Build the shared HTTP agent. Every provider call is bounded by `timeout`.
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

/// Map transport failures to messages fit for the error banner.
pub fn describe_http_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(401) | ureq::Error::StatusCode(403) => {
            anyhow::anyhow!("invalid API key")
        }
        ureq::Error::StatusCode(429) => anyhow::anyhow!("Quota exceeded, try again later"),
        ureq::Error::StatusCode(code) => anyhow::anyhow!("Provider returned HTTP {}", code),
        ureq::Error::Timeout(_) => anyhow::anyhow!("Request timed out"),
        other => anyhow::anyhow!("{}", other),
    }
}

//! Value generation for the four generator kinds (spec.md §3
//! `RotationPolicy.generator`).

use rand::distributions::Alphanumeric;
use rand::Rng;
use warden_types::Generator;

use crate::error::RotationError;

/// Produce a fresh value from `generator`. `random_bytes`/`random_alphanumeric`
/// and `uuid` never fail; only `webhook` can.
pub async fn generate(generator: &Generator, http: &reqwest::Client, timeout: std::time::Duration) -> Result<Vec<u8>, RotationError> {
    match generator {
        Generator::RandomBytes { n } => {
            let mut bytes = vec![0u8; *n];
            rand::thread_rng().fill(bytes.as_mut_slice());
            Ok(bytes)
        }
        Generator::RandomAlphanumeric { n } => {
            let value: String = rand::thread_rng().sample_iter(&Alphanumeric).take(*n).map(char::from).collect();
            Ok(value.into_bytes())
        }
        Generator::Uuid => Ok(uuid::Uuid::new_v4().to_string().into_bytes()),
        Generator::Webhook { url } => generate_from_webhook(url, http, timeout).await,
    }
}

/// Response payload a webhook generator must return.
#[derive(serde::Deserialize)]
struct WebhookValue {
    value: String,
}

async fn generate_from_webhook(url: &str, http: &reqwest::Client, timeout: std::time::Duration) -> Result<Vec<u8>, RotationError> {
    let response = http
        .post(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| RotationError::GeneratorFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RotationError::GeneratorFailed(format!("webhook returned status {}", response.status())));
    }

    let payload: WebhookValue = response
        .json()
        .await
        .map_err(|e| RotationError::GeneratorFailed(format!("malformed webhook response: {e}")))?;

    Ok(payload.value.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn random_bytes_generator_produces_requested_length() {
        let http = reqwest::Client::new();
        let value = generate(&Generator::RandomBytes { n: 24 }, &http, std::time::Duration::from_secs(1)).await.unwrap();
        assert_eq!(value.len(), 24);
    }

    #[tokio::test]
    async fn random_alphanumeric_generator_produces_requested_length() {
        let http = reqwest::Client::new();
        let value = generate(&Generator::RandomAlphanumeric { n: 16 }, &http, std::time::Duration::from_secs(1)).await.unwrap();
        assert_eq!(value.len(), 16);
        assert!(value.iter().all(|b| b.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn uuid_generator_produces_a_parseable_uuid() {
        let http = reqwest::Client::new();
        let value = generate(&Generator::Uuid, &http, std::time::Duration::from_secs(1)).await.unwrap();
        let text = String::from_utf8(value).unwrap();
        assert!(uuid::Uuid::parse_str(&text).is_ok());
    }
}

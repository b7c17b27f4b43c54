//! City/state inference for listings whose page did not carry a usable address.
//!
//! The service is a local Ollama model queried through `/api/generate` in
//! JSON mode. Every failure collapses into [`Location::not_found`] so one
//! unreachable model never costs the rest of the batch.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use super::normalize::unresolved;
use crate::core::config::LocationOptions;
use crate::core::types::{
    EnrichedListing, FieldValue, Location, NormalizedRecord, LOCATION_NOT_FOUND_TEXT,
};
use crate::core::ScoutError;

#[async_trait]
pub trait LocationService: Send + Sync {
    /// Infer a location from a listing title and whatever address text exists.
    async fn resolve(
        &self,
        title: &str,
        existing_address: Option<&str>,
    ) -> Result<Location, ScoutError>;
}

pub struct OllamaLocationService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaLocationService {
    pub fn new(options: &LocationOptions) -> Result<Self, ScoutError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScoutError::LocationService(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", options.base_url.trim_end_matches('/')),
            model: options.model.clone(),
        })
    }
}

#[async_trait]
impl LocationService for OllamaLocationService {
    async fn resolve(
        &self,
        title: &str,
        existing_address: Option<&str>,
    ) -> Result<Location, ScoutError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(title, existing_address),
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ScoutError::LocationService(format!(
                    "request to {} failed (is Ollama running with model `{}`?): {}",
                    self.endpoint, self.model, e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ScoutError::LocationService(format!(
                "generate failed: status={} body={}",
                status, text
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ScoutError::LocationService(format!("response json: {}", e)))?;
        parse_location_response(&value)
    }
}

fn build_prompt(title: &str, existing_address: Option<&str>) -> String {
    let address = existing_address.unwrap_or(LOCATION_NOT_FOUND_TEXT);
    format!(
        r#"Você é um assistente de geolocalização. Extraia a cidade e o estado a partir do título do anúncio e do endereço atual.
Se encontrar apenas um bairro, infira a cidade e o estado.
Se as informações forem insuficientes, use "{nf}" em todos os campos.

Responda somente com JSON, sem texto explicativo:
{{"cidade": "nome da cidade", "estado": "sigla do estado", "endereco_completo": "endereço mais preciso ou bairro, cidade, estado"}}

Exemplo de entrada:
Título: "Edifício Bonsucesso Logistics Park - Galpão para Alugar - Vila Nova Bonsucesso"
Endereço: "Detalhes da Oferta"

Exemplo de saída:
{{"cidade": "Guarulhos", "estado": "SP", "endereco_completo": "Vila Nova Bonsucesso, Guarulhos, SP"}}

Título para análise: "{title}"
Endereço atual: "{address}""#,
        nf = LOCATION_NOT_FOUND_TEXT,
        title = title,
        address = address,
    )
}

/// Decode an `/api/generate` reply: the `response` field holds the model's JSON as a string.
pub fn parse_location_response(value: &Value) -> Result<Location, ScoutError> {
    let raw = value
        .get("response")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScoutError::LocationService("reply has no `response` text".to_string()))?;

    let inner: Value = serde_json::from_str(raw).map_err(|e| {
        ScoutError::LocationService(format!("model output is not JSON ({}): {}", e, raw))
    })?;

    let field = |key: &str| {
        inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(LOCATION_NOT_FOUND_TEXT)
            .to_string()
    };

    let location = Location {
        city: field("cidade"),
        state: field("estado"),
        full_address: field("endereco_completo"),
    };
    if location.full_address == LOCATION_NOT_FOUND_TEXT
        && (location.city != LOCATION_NOT_FOUND_TEXT || location.state != LOCATION_NOT_FOUND_TEXT)
    {
        // Model gave a city but no address line; compose one from what it did give.
        let parts: Vec<&str> = [location.city.as_str(), location.state.as_str()]
            .into_iter()
            .filter(|p| *p != LOCATION_NOT_FOUND_TEXT)
            .collect();
        let full_address = parts.join(", ");
        return Ok(Location {
            full_address,
            ..location
        });
    }
    Ok(location)
}

/// Whether an address should be handed to the location service.
pub fn needs_resolution(address: &FieldValue, placeholders: &[String]) -> bool {
    match address {
        FieldValue::Unavailable | FieldValue::CollectionError => true,
        FieldValue::Present(text) => {
            let text = text.trim();
            text == LOCATION_NOT_FOUND_TEXT || placeholders.iter().any(|p| p.trim() == text)
        }
    }
}

async fn resolve_or_not_found(
    service: &dyn LocationService,
    title: &str,
    address: Option<&str>,
) -> Location {
    match service.resolve(title, address).await {
        Ok(location) => location,
        Err(e) => {
            error!("Location inference failed for `{}`: {}", title, e);
            Location::not_found()
        }
    }
}

/// Attach a [`Location`] to every listing whose address needs one. Returns how many were queried.
pub async fn resolve_listings(
    listings: &mut [EnrichedListing],
    service: &dyn LocationService,
    placeholders: &[String],
) -> usize {
    let pending: Vec<usize> = listings
        .iter()
        .enumerate()
        .filter(|(_, l)| needs_resolution(l.address(), placeholders))
        .map(|(i, _)| i)
        .collect();
    info!("Found {} listings needing location inference", pending.len());

    for &i in &pending {
        let listing = &mut listings[i];
        let existing = listing.address().as_present().map(str::to_string);
        let location =
            resolve_or_not_found(service, &listing.summary.title, existing.as_deref()).await;
        info!(
            "Listing {:?} located: {}, {}",
            listing.id, location.city, location.state
        );
        listing.location = Some(location);
    }
    pending.len()
}

/// Re-enrich rows of a previously exported dataset.
///
/// A row is queried when its address needs resolution or it still lacks a
/// city or state. The address cell is only replaced when it was a placeholder
/// or missing; a real scraped address is kept next to the inferred city/state.
pub async fn resolve_records(
    records: &mut [NormalizedRecord],
    service: &dyn LocationService,
    placeholders: &[String],
) -> usize {
    let known = |v: &Option<String>| {
        v.as_deref()
            .is_some_and(|s| !s.trim().is_empty() && s.trim() != LOCATION_NOT_FOUND_TEXT)
    };

    let mut queried = 0;
    for record in records.iter_mut() {
        let address_missing = needs_resolution(&record.full_address, placeholders);
        if !address_missing && known(&record.city) && known(&record.state) {
            continue;
        }
        queried += 1;

        let existing = record.full_address.as_present().map(str::to_string);
        let location = resolve_or_not_found(service, &record.title, existing.as_deref()).await;
        if location.is_not_found() {
            warn!("Record {} could not be located", record.id);
            if address_missing {
                record.full_address = unresolved(&record.full_address);
            }
            continue;
        }

        if address_missing {
            record.full_address = FieldValue::present(&location.full_address);
        }
        record.city = Some(location.city).filter(|c| c != LOCATION_NOT_FOUND_TEXT);
        record.state = Some(location.state).filter(|s| s != LOCATION_NOT_FOUND_TEXT);
        info!(
            "Record {} enriched: {}, {}",
            record.id,
            record.city.as_deref().unwrap_or("?"),
            record.state.as_deref().unwrap_or("?")
        );
    }
    info!("Location enrichment finished: {} records queried", queried);
    queried
}

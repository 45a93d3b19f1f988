// Sorting request model: validation of untrusted JSON input and the
// outbound representation of a sorted request.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::currency::CurrencyConverter;

/// The single rejection produced for any invalid request. It deliberately
/// does not say which field or itinerary failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Format of the given sorting request is not valid.")]
pub struct MalformedRequest;

// Itineraries sorting criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortingType {
    // by price in the reference currency
    Cheapest,
    // by duration
    Fastest,
    // weighted blend of duration and price
    Best,
}

impl SortingType {
    pub const ALL: [SortingType; 3] = [Self::Cheapest, Self::Fastest, Self::Best];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortingType::Cheapest => "cheapest",
            SortingType::Fastest => "fastest",
            SortingType::Best => "best",
        }
    }
}

impl std::fmt::Display for SortingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Wire shapes shared by the inbound body, the outbound body and cache snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PricePayload {
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItineraryPayload {
    pub id: String,
    pub duration_minutes: i64,
    pub price: PricePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestPayload {
    pub sorting_type: SortingType,
    pub itineraries: Vec<ItineraryPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResponsePayload {
    pub sorting_type: SortingType,
    pub sorted_itineraries: Vec<ItineraryPayload>,
}

/// Price of an itinerary. The reference-currency amount is derived once at
/// construction and takes no part in equality or hashing.
#[derive(Debug, Clone)]
pub struct Price {
    amount: u64,
    currency: String,
    amount_in_reference: f64,
}

impl Price {
    pub fn new(
        amount: u64,
        currency: impl Into<String>,
        converter: &CurrencyConverter,
    ) -> Result<Self, MalformedRequest> {
        let currency = currency.into();
        let amount_in_reference = converter.to_reference(amount, &currency).map_err(|e| {
            debug!(error = %e, "price conversion failed");
            MalformedRequest
        })?;

        Ok(Self {
            amount,
            currency,
            amount_in_reference,
        })
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn amount_in_reference(&self) -> f64 {
        self.amount_in_reference
    }

    fn to_payload(&self) -> PricePayload {
        PricePayload {
            amount: self.amount,
            currency: self.currency.clone(),
        }
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.amount == other.amount && self.currency == other.currency
    }
}

impl Eq for Price {}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.amount.hash(state);
        self.currency.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Itinerary {
    id: String,
    // total travel time including layovers, in minutes
    duration: i64,
    price: Price,
}

impl Itinerary {
    pub fn new(id: impl Into<String>, duration: i64, price: Price) -> Result<Self, MalformedRequest> {
        let id = id.into();
        if id.is_empty() {
            debug!("itinerary with empty id");
            return Err(MalformedRequest);
        }

        Ok(Self { id, duration, price })
    }

    pub fn from_payload(
        payload: ItineraryPayload,
        converter: &CurrencyConverter,
    ) -> Result<Self, MalformedRequest> {
        let price = Price::new(payload.price.amount, payload.price.currency, converter)?;
        Self::new(payload.id, payload.duration_minutes, price)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn to_payload(&self) -> ItineraryPayload {
        ItineraryPayload {
            id: self.id.clone(),
            duration_minutes: self.duration,
            price: self.price.to_payload(),
        }
    }
}

/// A validated sorting request. Only the order of `itineraries` ever changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    sorting_type: SortingType,
    itineraries: Vec<Itinerary>,
}

impl SortRequest {
    pub fn new(sorting_type: SortingType, itineraries: Vec<Itinerary>) -> Self {
        Self {
            sorting_type,
            itineraries,
        }
    }

    /// Validates an already decoded JSON body. Either every itinerary is
    /// valid or the whole request is rejected.
    pub fn from_value(value: &Value, converter: &CurrencyConverter) -> Result<Self, MalformedRequest> {
        let payload = RequestPayload::deserialize(value).map_err(|e| {
            debug!(error = %e, "request does not match the expected shape");
            MalformedRequest
        })?;

        Self::from_payload(payload, converter)
    }

    pub fn from_json_str(body: &str, converter: &CurrencyConverter) -> Result<Self, MalformedRequest> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            debug!(error = %e, "request body is not JSON");
            MalformedRequest
        })?;

        Self::from_value(&value, converter)
    }

    pub fn from_payload(
        payload: RequestPayload,
        converter: &CurrencyConverter,
    ) -> Result<Self, MalformedRequest> {
        let itineraries = payload
            .itineraries
            .into_iter()
            .map(|i| Itinerary::from_payload(i, converter))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(payload.sorting_type, itineraries))
    }

    pub fn sorting_type(&self) -> SortingType {
        self.sorting_type
    }

    pub fn itineraries(&self) -> &[Itinerary] {
        &self.itineraries
    }

    pub(crate) fn itineraries_mut(&mut self) -> &mut [Itinerary] {
        &mut self.itineraries
    }

    pub fn to_payload(&self) -> ResponsePayload {
        ResponsePayload {
            sorting_type: self.sorting_type,
            sorted_itineraries: self.itineraries.iter().map(Itinerary::to_payload).collect(),
        }
    }

    /// Outbound JSON body, pretty-printed with a two space indent.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_payload())
    }
}

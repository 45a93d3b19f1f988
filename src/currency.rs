// Currency conversion against a euro foreign-exchange reference table.
// The table is loaded once by the owning process and shared by reference.

use std::{collections::HashMap, path::Path};

use chrono::NaiveDate;
use quick_xml::{
    events::{attributes::Attributes, Event},
    Reader,
};
use thiserror::Error;
use tracing::debug;

/// Currency every price is normalised to before comparison.
pub const REFERENCE_CURRENCY: &str = "EUR";

/// Snapshot of the ECB daily reference rates shipped with the crate.
pub const EMBEDDED_RATES_XML: &str = include_str!("../data/eurofxref-daily.xml");

#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Rate table error: {0}")]
    RateTable(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    // units of each currency per one EUR
    rates: HashMap<String, f64>,
    published: Option<NaiveDate>,
}

impl CurrencyConverter {
    /// Builds a converter from the rate snapshot embedded in the binary.
    pub fn embedded() -> Result<Self, CurrencyError> {
        Self::from_ecb_xml(EMBEDDED_RATES_XML)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CurrencyError> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        Self::from_ecb_xml(&xml)
    }

    /// Builds a converter from explicit `(code, units per EUR)` pairs.
    pub fn from_rates<I, S>(rates: I) -> Result<Self, CurrencyError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table = HashMap::new();
        table.insert(REFERENCE_CURRENCY.to_string(), 1.0);

        for (code, rate) in rates {
            let code = code.into();
            Self::check_rate(&code, rate)?;
            table.insert(code, rate);
        }

        Ok(Self {
            rates: table,
            published: None,
        })
    }

    /// Parses an ECB `eurofxref` document:
    /// `<Cube time="YYYY-MM-DD"><Cube currency="USD" rate="1.08"/>...</Cube>`.
    pub fn from_ecb_xml(xml: &str) -> Result<Self, CurrencyError> {
        fn get_attr_map(attrs: Attributes) -> Result<HashMap<Vec<u8>, String>, CurrencyError> {
            let mut map = HashMap::new();
            for attr in attrs {
                let attr = attr.map_err(|e| CurrencyError::RateTable(e.to_string()))?;
                map.insert(
                    attr.key.as_ref().to_vec(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                );
            }
            Ok(map)
        }

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut rates = HashMap::new();
        rates.insert(REFERENCE_CURRENCY.to_string(), 1.0);
        let mut published = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(CurrencyError::RateTable(e.to_string())),
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Cube" => {
                    let mut map = get_attr_map(e.attributes())?;

                    if let Some(time) = map.remove(b"time".as_slice()) {
                        let date = NaiveDate::parse_from_str(&time, "%Y-%m-%d").map_err(|e| {
                            CurrencyError::RateTable(format!("invalid date {time:?}: {e}"))
                        })?;
                        published = Some(date);
                    }

                    if let Some(code) = map.remove(b"currency".as_slice()) {
                        let raw = map.remove(b"rate".as_slice()).ok_or_else(|| {
                            CurrencyError::RateTable(format!("missing rate for {code}"))
                        })?;
                        let rate = raw.trim().parse::<f64>().map_err(|_| {
                            CurrencyError::RateTable(format!("invalid rate {raw:?} for {code}"))
                        })?;
                        Self::check_rate(&code, rate)?;
                        rates.insert(code, rate);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
            }

            buf.clear();
        }

        if rates.len() == 1 {
            return Err(CurrencyError::RateTable("no exchange rates found".to_string()));
        }

        debug!(
            currencies = rates.len(),
            published = ?published,
            "loaded exchange rate table"
        );

        Ok(Self { rates, published })
    }

    fn check_rate(code: &str, rate: f64) -> Result<(), CurrencyError> {
        if rate.is_finite() && rate > 0.0 {
            Ok(())
        } else {
            Err(CurrencyError::RateTable(format!(
                "rate for {code} must be positive, got {rate}"
            )))
        }
    }

    pub fn published(&self) -> Option<NaiveDate> {
        self.published
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    pub fn is_known(&self, currency: &str) -> bool {
        self.rates.contains_key(currency)
    }

    pub fn convert(&self, amount: u64, from: &str, to: &str) -> Result<f64, CurrencyError> {
        let from_rate = self
            .rate(from)
            .ok_or_else(|| CurrencyError::UnknownCurrency(from.to_string()))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| CurrencyError::UnknownCurrency(to.to_string()))?;

        Ok(amount as f64 / from_rate * to_rate)
    }

    pub fn to_reference(&self, amount: u64, from: &str) -> Result<f64, CurrencyError> {
        self.convert(amount, from, REFERENCE_CURRENCY)
    }
}

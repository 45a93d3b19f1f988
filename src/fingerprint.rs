// Stable, order-sensitive identity of a sorting request, used as the cache key.
//
// Encoding (all integers big-endian):
//   item  = sha256(len(id):u64 | id | duration:i64 | amount:u64 | len(currency):u64 | currency)
//   items = sha256(item_1 | item_2 | ... | item_n)
//   key   = sha256("itinerary-sort/v1" | 0x00 | sorting_type | 0x00 | items)

use sha2::{Digest, Sha256};

use crate::request::{Itinerary, SortRequest};

const DOMAIN_TAG: &[u8] = b"itinerary-sort/v1";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Lowercase hex text of the digest; this is the store key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn itinerary_digest(itinerary: &Itinerary) -> [u8; 32] {
    let id = itinerary.id().as_bytes();
    let currency = itinerary.price().currency().as_bytes();

    let mut hasher = Sha256::new();
    hasher.update((id.len() as u64).to_be_bytes());
    hasher.update(id);
    hasher.update(itinerary.duration().to_be_bytes());
    hasher.update(itinerary.price().amount().to_be_bytes());
    hasher.update((currency.len() as u64).to_be_bytes());
    hasher.update(currency);
    hasher.finalize().into()
}

pub fn fingerprint(request: &SortRequest) -> Fingerprint {
    // concatenation keeps the combination order-sensitive
    let mut items = Sha256::new();
    for itinerary in request.itineraries() {
        items.update(itinerary_digest(itinerary));
    }

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update([0u8]);
    hasher.update(request.sorting_type().as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(items.finalize());

    Fingerprint(hex::encode(hasher.finalize()))
}

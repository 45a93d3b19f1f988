// Ordering strategies. All of them are stable sorts applied in place.

use crate::request::{Itinerary, SortRequest, SortingType};

pub const DURATION_WEIGHT: f64 = 1.0;
pub const PRICE_WEIGHT: f64 = 5.0;

/// Composite key used by [`SortingType::Best`]; lower is better.
pub fn best_score(itinerary: &Itinerary) -> f64 {
    DURATION_WEIGHT * itinerary.duration() as f64
        + PRICE_WEIGHT * itinerary.price().amount_in_reference()
}

fn sort_cheapest(itineraries: &mut [Itinerary]) {
    itineraries.sort_by(|a, b| {
        a.price()
            .amount_in_reference()
            .total_cmp(&b.price().amount_in_reference())
    });
}

fn sort_fastest(itineraries: &mut [Itinerary]) {
    itineraries.sort_by_key(Itinerary::duration);
}

fn sort_best(itineraries: &mut [Itinerary]) {
    itineraries.sort_by(|a, b| best_score(a).total_cmp(&best_score(b)));
}

pub fn sort_itineraries(sorting_type: SortingType, itineraries: &mut [Itinerary]) {
    match sorting_type {
        SortingType::Cheapest => sort_cheapest(itineraries),
        SortingType::Fastest => sort_fastest(itineraries),
        SortingType::Best => sort_best(itineraries),
    }
}

/// Reorders the request's itineraries by its own criterion.
pub fn sort_request(request: &mut SortRequest) {
    let sorting_type = request.sorting_type();
    sort_itineraries(sorting_type, request.itineraries_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyConverter;
    use crate::request::Price;
    use rand::seq::SliceRandom;

    fn converter() -> CurrencyConverter {
        CurrencyConverter::embedded().unwrap()
    }

    fn itinerary(converter: &CurrencyConverter, id: &str, duration: i64, amount: u64, currency: &str) -> Itinerary {
        Itinerary::new(id, duration, Price::new(amount, currency, converter).unwrap()).unwrap()
    }

    fn ids(request: &SortRequest) -> Vec<&str> {
        request.itineraries().iter().map(Itinerary::id).collect()
    }

    #[test]
    fn test_sort_cheapest_same_currency() {
        let c = converter();
        let mut request = SortRequest::new(
            SortingType::Cheapest,
            vec![
                itinerary(&c, "foo", 10, 200, "CZK"),
                itinerary(&c, "bar", 20, 100, "CZK"),
            ],
        );

        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["bar", "foo"]);
    }

    #[test]
    fn test_sort_cheapest_mixed_currencies() {
        let c = converter();
        // 10 USD is worth more than 100 CZK
        let mut request = SortRequest::new(
            SortingType::Cheapest,
            vec![
                itinerary(&c, "foo", 10, 10, "USD"),
                itinerary(&c, "bar", 20, 100, "CZK"),
            ],
        );

        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["bar", "foo"]);
    }

    #[test]
    fn test_sort_fastest() {
        let c = converter();
        let mut request = SortRequest::new(
            SortingType::Fastest,
            vec![
                itinerary(&c, "foo", 300, 100, "EUR"),
                itinerary(&c, "bar", 150, 200, "EUR"),
            ],
        );

        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["bar", "foo"]);
    }

    #[test]
    fn test_sort_best() {
        let c = converter();

        // 300 + 5 * 102 = 810 < 320 + 5 * 100 = 820
        let mut request = SortRequest::new(
            SortingType::Best,
            vec![
                itinerary(&c, "foo", 300, 102, "EUR"),
                itinerary(&c, "bar", 320, 100, "EUR"),
            ],
        );
        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["foo", "bar"]);

        // 312 + 5 * 102 = 822 > 820
        let mut request = SortRequest::new(
            SortingType::Best,
            vec![
                itinerary(&c, "foo", 312, 102, "EUR"),
                itinerary(&c, "bar", 320, 100, "EUR"),
            ],
        );
        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["bar", "foo"]);
    }

    #[test]
    fn test_best_score_weights() {
        let c = converter();
        let i = itinerary(&c, "foo", 300, 102, "EUR");
        assert_eq!(best_score(&i), 810.0);
    }

    #[test]
    fn test_empty_and_single() {
        let c = converter();
        for sorting_type in SortingType::ALL {
            let mut empty = SortRequest::new(sorting_type, vec![]);
            sort_request(&mut empty);
            assert!(empty.itineraries().is_empty());

            let mut single = SortRequest::new(sorting_type, vec![itinerary(&c, "only", 1, 1, "EUR")]);
            sort_request(&mut single);
            assert_eq!(ids(&single), vec!["only"]);
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let c = converter();
        // every itinerary has the same duration, price and best score
        let mut tied: Vec<Itinerary> = (0..50)
            .map(|i| itinerary(&c, &format!("it{i}"), 100, 50, "EUR"))
            .collect();
        tied.shuffle(&mut rand::thread_rng());
        let expected: Vec<String> = tied.iter().map(|i| i.id().to_string()).collect();

        for sorting_type in SortingType::ALL {
            let mut request = SortRequest::new(sorting_type, tied.clone());
            sort_request(&mut request);
            let got: Vec<String> = request.itineraries().iter().map(|i| i.id().to_string()).collect();
            assert_eq!(got, expected, "{sorting_type} reordered equal keys");
        }
    }

    #[test]
    fn test_stable_with_mixed_keys() {
        let c = converter();
        let mut request = SortRequest::new(
            SortingType::Fastest,
            vec![
                itinerary(&c, "a", 20, 1, "EUR"),
                itinerary(&c, "b", 10, 2, "EUR"),
                itinerary(&c, "c", 20, 3, "EUR"),
                itinerary(&c, "d", 10, 4, "EUR"),
            ],
        );

        sort_request(&mut request);
        assert_eq!(ids(&request), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_sorted_output_is_ordered() {
        let c = converter();
        let currencies = ["EUR", "CZK", "USD", "GBP", "JPY"];
        let mut itineraries = Vec::new();
        for i in 0..200u64 {
            let currency = currencies[(i % currencies.len() as u64) as usize];
            itineraries.push(itinerary(&c, &format!("it{i}"), (i * 37 % 500) as i64, i * 13 % 900, currency));
        }
        itineraries.shuffle(&mut rand::thread_rng());

        let mut request = SortRequest::new(SortingType::Cheapest, itineraries.clone());
        sort_request(&mut request);
        assert!(request
            .itineraries()
            .windows(2)
            .all(|w| w[0].price().amount_in_reference() <= w[1].price().amount_in_reference()));

        let mut request = SortRequest::new(SortingType::Best, itineraries);
        sort_request(&mut request);
        assert!(request
            .itineraries()
            .windows(2)
            .all(|w| best_score(&w[0]) <= best_score(&w[1])));
    }
}

use crate::locate::PriceCandidate;
use crate::rules::FieldCategory;

/// Base prices outside this open range are treated as noise when a better one exists
const BASE_PRICE_RANGE: (f64, f64) = (10.0, 50_000.0);

/// Pick the best candidate for `category`, or `None` if there are none.
pub fn select_best<N: Clone>(
    candidates: &[PriceCandidate<N>],
    category: FieldCategory,
) -> Option<PriceCandidate<N>> {
    match candidates {
        [] => return None,
        [only] => return Some(only.clone()),
        _ => {}
    }

    let relevant: Vec<&PriceCandidate<N>> = candidates
        .iter()
        .filter(|c| c.context.is_relevant(category))
        .collect();
    let filtered: Vec<&PriceCandidate<N>> = if relevant.is_empty() {
        candidates.iter().collect()
    } else {
        relevant
    };

    let chosen = match category {
        FieldCategory::Total => filtered
            .iter()
            .copied()
            .reduce(|max, current| if current.value > max.value { current } else { max }),
        FieldCategory::BasePrice => filtered
            .iter()
            .copied()
            .find(|c| c.value > BASE_PRICE_RANGE.0 && c.value < BASE_PRICE_RANGE.1)
            .or_else(|| filtered.first().copied()),
        _ => filtered
            .iter()
            .copied()
            .find(|c| c.context.is_relevant(category))
            .or_else(|| filtered.first().copied()),
    };

    chosen.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::locate::DiscoveryMethod;

    fn candidate(value: f64, context: &str) -> PriceCandidate<usize> {
        PriceCandidate {
            value,
            node: value as usize,
            discovery_method: DiscoveryMethod::Selector,
            context: Context::from_text(context.to_string()),
        }
    }

    #[test]
    fn test_empty_and_single() {
        assert!(select_best::<usize>(&[], FieldCategory::Taxes).is_none());
        let only = [candidate(5.0, "unrelated")];
        assert_eq!(select_best(&only, FieldCategory::Taxes).unwrap().value, 5.0);
    }

    #[test]
    fn test_total_picks_max_of_relevant() {
        let set = [
            candidate(539.0, "grand total"),
            candidate(2000.0, "you saved"),
            candidate(600.0, "total payable"),
            candidate(600.0, "final amount"),
        ];
        let chosen = select_best(&set, FieldCategory::Total).unwrap();
        assert_eq!(chosen.value, 600.0);
        assert_eq!(chosen.context.raw_text, "total payable");
    }

    #[test]
    fn test_base_price_skips_tiny_values() {
        let set = [candidate(5.0, "item price"), candidate(499.0, "item price")];
        assert_eq!(select_best(&set, FieldCategory::BasePrice).unwrap().value, 499.0);

        let set = [candidate(5.0, "item price"), candidate(8.0, "item price")];
        assert_eq!(select_best(&set, FieldCategory::BasePrice).unwrap().value, 5.0);
    }

    #[test]
    fn test_fee_prefers_context_match() {
        let set = [candidate(99.0, "coupon"), candidate(40.0, "delivery charges")];
        assert_eq!(select_best(&set, FieldCategory::DeliveryFee).unwrap().value, 40.0);
    }

    #[test]
    fn test_fee_falls_back_to_first_when_nothing_matches() {
        let set = [candidate(12.0, "misc"), candidate(40.0, "misc")];
        assert_eq!(select_best(&set, FieldCategory::ConvenienceFee).unwrap().value, 12.0);
    }
}

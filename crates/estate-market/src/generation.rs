//! Synthetic listings for scenarios that do not spell out a catalog.

use estate_core::{CatalogEntry, Category, GenerateSpec, Income, PropertyId};
use rand::Rng;
use rust_decimal::Decimal;

const STREET_NAMES: [&str; 10] = [
    "Oak", "Pine", "Elm", "Maple", "Cedar", "Hill", "Lake", "River", "Park", "Main",
];
const STREET_TYPES: [&str; 8] = ["St", "Ave", "Blvd", "Ln", "Ct", "Rd", "Dr", "Way"];

fn units_for<R: Rng>(rng: &mut R, category: Category) -> u32 {
    match category {
        Category::Duplex => 2,
        Category::Triplex => 3,
        Category::Fourplex => 4,
        Category::Apartment => rng.gen_range(5..=15),
        Category::ApartmentComplex => rng.gen_range(16..=150),
        Category::Commercial => 1,
    }
}

fn address<R: Rng>(rng: &mut R) -> String {
    let number: u32 = rng.gen_range(1..=9999);
    let name = STREET_NAMES[rng.gen_range(0..STREET_NAMES.len())];
    let kind = STREET_TYPES[rng.gen_range(0..STREET_TYPES.len())];
    format!("{number:04} {name} {kind}")
}

/// Share of listings that are overpriced for their rent.
const UNDERPERFORMING_ODDS: f64 = 0.3;

/// Per-unit price and rental figures for one listing.
fn economics<R: Rng>(rng: &mut R) -> (Decimal, Income) {
    let mut per_unit = Decimal::from(rng.gen_range(150_000i64..=250_000));
    let mut rent = Decimal::from(rng.gen_range(1_200i64..=2_200));
    // 35% +/- 5%
    let expense_ratio = Decimal::new(rng.gen_range(3_000..=4_000), 4);
    let management_fee_pct = Decimal::new(rng.gen_range(500..=800), 2);
    if rng.gen_bool(UNDERPERFORMING_ODDS) {
        rent = (rent * Decimal::new(rng.gen_range(70..=90), 2)).round_dp(2);
        per_unit = (per_unit * Decimal::new(rng.gen_range(110..=130), 2)).round_dp(2);
    }
    let income = Income {
        rent_per_unit: rent,
        expense_ratio,
        management_fee_pct,
    };
    (per_unit, income)
}

/// Generate `spec.per_category` listings for every category, in
/// [`Category::ALL`] order. Ids are `<category>-<n>` starting at 1.
///
/// Base price is units x a per-unit price drawn from [150k, 250k] USD, with
/// monthly rent of 1.2k-2.2k per unit. About a third of listings come out
/// overpriced: rent cut to 70-90% and price raised to 110-130%.
pub fn generate_catalog<R: Rng>(rng: &mut R, spec: &GenerateSpec) -> Vec<CatalogEntry> {
    let mut out = Vec::with_capacity(Category::ALL.len() * spec.per_category as usize);
    for category in Category::ALL {
        for n in 1..=spec.per_category {
            let units = units_for(rng, category);
            let (per_unit, income) = economics(rng);
            out.push(CatalogEntry {
                id: PropertyId(format!("{}-{n}", category.slug())),
                category,
                base_price: per_unit * Decimal::from(units),
                volatility: spec.volatility,
                address: Some(address(rng)),
                units,
                income: Some(income),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn spec() -> GenerateSpec {
        GenerateSpec {
            per_category: 5,
            volatility: 0.08,
        }
    }

    #[test]
    fn generates_every_category() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let entries = generate_catalog(&mut rng, &spec());
        assert_eq!(entries.len(), 30);
        assert_eq!(entries[0].id, PropertyId::new("duplex-1"));
        assert_eq!(entries[29].id, PropertyId::new("commercial-5"));
        for e in &entries {
            let per_unit = e.base_price / Decimal::from(e.units);
            assert!(per_unit >= Decimal::from(150_000));
            assert!(per_unit <= Decimal::from(325_000));
            let income = e.income.as_ref().unwrap();
            assert!(income.rent_per_unit >= Decimal::from(840));
            assert!(income.rent_per_unit <= Decimal::from(2_200));
            assert!(income.expense_ratio >= Decimal::new(30, 2));
            assert!(income.expense_ratio <= Decimal::new(40, 2));
            assert!(income.management_fee_pct >= Decimal::from(5));
            assert!(income.management_fee_pct <= Decimal::from(8));
            assert_eq!(e.volatility, 0.08);
            let addr = e.address.as_deref().unwrap();
            assert_eq!(addr.split(' ').count(), 3);
            assert_eq!(addr.split(' ').next().unwrap().len(), 4);
        }
        let complex = entries
            .iter()
            .find(|e| e.category == Category::ApartmentComplex)
            .unwrap();
        assert!((16..=150).contains(&complex.units));
    }

    #[test]
    fn cap_rates_spread_across_valuations() {
        let entries = generate_catalog(&mut ChaCha8Rng::seed_from_u64(21), &spec());
        let catalog = estate_core::Catalog::from_entries(&entries).unwrap();
        let rates: Vec<Decimal> = catalog.iter().filter_map(|p| p.cap_rate()).collect();
        assert_eq!(rates.len(), 30);
        // Best case 2200 x 12 x 0.70 / 150k = 12.32%; worst 840 x 12 x 0.60 / 325k = 1.86%.
        assert!(rates.iter().all(|r| *r > Decimal::ONE && *r < Decimal::new(13, 0)));
        assert!(catalog.best_investment().is_some());
    }

    #[test]
    fn generation_is_seeded() {
        let a = generate_catalog(&mut ChaCha8Rng::seed_from_u64(4), &spec());
        let b = generate_catalog(&mut ChaCha8Rng::seed_from_u64(4), &spec());
        let prices = |v: &[CatalogEntry]| v.iter().map(|e| e.base_price).collect::<Vec<_>>();
        assert_eq!(prices(&a), prices(&b));
    }
}

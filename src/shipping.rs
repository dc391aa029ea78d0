/// Shipping fee lookup used by checkout. Amounts are in minor currency units.
pub trait ShippingRates: Send + Sync {
    fn shipping_cost(&self, city: &str) -> i64;
}

/// Two-tier rate: a cheaper fee when the city names a metro area, a standard
/// fee everywhere else. Matching is a case-insensitive substring test, so
/// "Kathmandu-10, Baneshwor" counts as Kathmandu.
#[derive(Debug, Clone)]
pub struct MetroRateTable {
    metro_cities: Vec<String>,
    metro_fee: i64,
    standard_fee: i64,
}

impl MetroRateTable {
    pub fn new<I, S>(metro_cities: I, metro_fee: i64, standard_fee: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metro_cities = metro_cities
            .into_iter()
            .map(|city| city.as_ref().trim().to_lowercase())
            .filter(|city| !city.is_empty())
            .collect();
        Self {
            metro_cities,
            metro_fee,
            standard_fee,
        }
    }

    pub fn is_metro(&self, city: &str) -> bool {
        let city = city.to_lowercase();
        self.metro_cities.iter().any(|metro| city.contains(metro.as_str()))
    }
}

impl ShippingRates for MetroRateTable {
    fn shipping_cost(&self, city: &str) -> i64 {
        if self.is_metro(city) {
            self.metro_fee
        } else {
            self.standard_fee
        }
    }
}

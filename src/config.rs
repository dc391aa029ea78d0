use std::{env, path::PathBuf};

use crate::shipping::MetroRateTable;

const DEFAULT_METRO_CITIES: &str = "Kathmandu,Lalitpur,Bhaktapur";
const DEFAULT_MAX_EVIDENCE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub metro_cities: Vec<String>,
    pub metro_shipping_fee: i64,
    pub standard_shipping_fee: i64,
    pub evidence_dir: PathBuf,
    pub max_evidence_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("APP_PORT").unwrap_or(3000);
        let metro_cities = parse_city_list(
            &env::var("METRO_CITIES").unwrap_or_else(|_| DEFAULT_METRO_CITIES.to_string()),
        );
        let metro_shipping_fee = env_parse("METRO_SHIPPING_FEE").unwrap_or(10_000);
        let standard_shipping_fee = env_parse("STANDARD_SHIPPING_FEE").unwrap_or(15_000);
        let evidence_dir = env::var("EVIDENCE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads/payments"));
        let max_evidence_bytes =
            env_parse("MAX_EVIDENCE_BYTES").unwrap_or(DEFAULT_MAX_EVIDENCE_BYTES);

        if metro_shipping_fee < 0 || standard_shipping_fee < 0 {
            anyhow::bail!("shipping fees must not be negative");
        }

        Ok(Self {
            database_url,
            host,
            port,
            metro_cities,
            metro_shipping_fee,
            standard_shipping_fee,
            evidence_dir,
            max_evidence_bytes,
        })
    }

    pub fn shipping_rates(&self) -> MetroRateTable {
        MetroRateTable::new(
            &self.metro_cities,
            self.metro_shipping_fee,
            self.standard_shipping_fee,
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

pub fn parse_city_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(str::to_string)
        .collect()
}

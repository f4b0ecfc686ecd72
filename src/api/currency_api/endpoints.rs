//! URL builders for the fawazahmed0 currency API mirrored on jsDelivr

const PACKAGE: &str = "npm/@fawazahmed0/currency-api";

/// Version tag that always resolves to the newest published snapshot
pub const LATEST: &str = "latest";

/// `{api_base}/npm/@fawazahmed0/currency-api@{version}/v1/currencies/{base}.min.json`
///
/// `version` is either an ISO day (`2024-03-01`) or [`LATEST`]. The payload is
/// `{ "<base>": { "<target>": rate, ... } }`.
pub fn historical_rates_url(api_base: &str, version: &str, base: &str) -> String {
    format!(
        "{}/{}@{}/v1/currencies/{}.min.json",
        api_base.trim_end_matches('/'),
        PACKAGE,
        version,
        base
    )
}

/// `{api_base}/npm/@fawazahmed0/currency-api@latest/v1/currencies.json`
pub fn currencies_url(api_base: &str) -> String {
    format!(
        "{}/{}@{}/v1/currencies.json",
        api_base.trim_end_matches('/'),
        PACKAGE,
        LATEST
    )
}

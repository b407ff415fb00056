use async_trait::async_trait;
use crate::{MetricsError, RawFinancialData};

/// A fetch adapter for one financial data provider.
///
/// Adapters decide which fields a record carries; the engine only relies on
/// `ticker` and `name` being present.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Short provider label used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self, ticker: &str) -> Result<RawFinancialData, MetricsError>;
}

/// Fetch every ticker in order, keeping the records that arrived.
/// A failed ticker is logged and skipped.
pub async fn fetch_all(
    provider: &dyn FinancialDataProvider,
    tickers: &[String],
) -> Vec<RawFinancialData> {
    let mut records = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        match provider.fetch(ticker).await {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("{} fetch failed for {}: {}", provider.name(), ticker, e);
            }
        }
    }

    tracing::debug!(
        "{} returned {}/{} records",
        provider.name(),
        records.len(),
        tickers.len()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider;

    #[async_trait]
    impl FinancialDataProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, ticker: &str) -> Result<RawFinancialData, MetricsError> {
            match ticker {
                "AAPL" => Ok(RawFinancialData::new("AAPL", "Apple Inc").with("price", 190.0)),
                other => Err(MetricsError::Provider(format!("unknown ticker {}", other))),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failures() {
        let tickers = vec!["AAPL".to_string(), "ZZZZ".to_string()];
        let records = fetch_all(&StaticProvider, &tickers).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ticker(), "AAPL");
    }
}

//! DNS TXT record source for domain-proof authentication.

use crate::error::{AuthError, Result};
use crate::proof::RecordSource;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

/// Fetches TXT records for the proof domain via the system resolver.
pub struct DnsRecordSource {
    resolver: TokioAsyncResolver,
}

impl DnsRecordSource {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for DnsRecordSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for DnsRecordSource {
    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .txt_lookup(domain.to_string())
            .await
            .map_err(|e| AuthError::Dns(e.to_string()))?;

        // A TXT record may span several character-strings; rejoin them.
        let records: Vec<String> = lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect::<String>()
            })
            .collect();

        debug!(domain = %domain, records = records.len(), "TXT lookup complete");
        Ok(records)
    }
}

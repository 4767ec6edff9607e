//! Profile fingerprints for logs
//!
//! Logs identify a submission by the SHA-256 of its agent payload, never
//! by the financial values themselves.

use crate::models::{AgentRequest, FinancialProfile};
use sha2::{Digest, Sha256};
use std::io::Write;

/// Compute SHA256 hex digest of the profile as sent to the agent.
/// Streams JSON directly into the hasher (no intermediate String).
pub fn profile_fingerprint(profile: &FinancialProfile) -> String {
    let request = AgentRequest::from(profile);
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), &request).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Shortened fingerprint for log lines
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn profile(income: &str) -> FinancialProfile {
        FinancialProfile {
            annual_income: income.into(),
            income_replacement_years: 10,
            total_debt: 0.0.into(),
            savings: 0.0.into(),
            existing_coverage: 0.0.into(),
            location: "Canada".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            age: Some(40),
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = profile("$80,000");
        let fingerprint = profile_fingerprint(&a);

        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, profile_fingerprint(&a.clone()));
        assert_eq!(short_fingerprint(&fingerprint).len(), 12);
    }

    #[test]
    fn test_fingerprint_follows_parsed_payload() {
        // same parsed amount, same agent payload
        assert_eq!(
            profile_fingerprint(&profile("$80,000")),
            profile_fingerprint(&profile("80000"))
        );
        assert_ne!(
            profile_fingerprint(&profile("80000")),
            profile_fingerprint(&profile("80001"))
        );
    }
}

//! Signature report and verification snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validity status of one embedded signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    /// Cryptographically valid and trusted.
    Valid,
    /// Cryptographically broken or untrusted.
    Invalid,
    /// Could not be determined (missing revocation data, unknown CA, ...).
    Indeterminate,
}

/// Identity of a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl Signer {
    /// Full name as displayed on the request.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// One signature found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedSignature {
    /// Validity status.
    pub status: SignatureStatus,
    /// Signer, reported for valid signatures.
    #[serde(default)]
    pub signer: Option<Signer>,
    /// Claimed signing time.
    #[serde(default)]
    pub signing_time: Option<DateTime<Utc>>,
}

/// Verifier output: signatures in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Embedded signatures.
    #[serde(default)]
    pub signatures: Vec<EmbeddedSignature>,
}

/// Snapshot of a verification pass stored on a revocation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVerification {
    /// At least one signature was found.
    pub has_signature: bool,
    /// At least one signature is `VALID`.
    pub crypto_valid: bool,
    /// Subject of the first signature.
    pub signer_subject: Option<String>,
    /// Signing time of the first signature.
    pub signing_time: Option<DateTime<Utc>>,
    /// Human readable findings.
    pub notes: Vec<String>,
    /// When the verification ran.
    pub verified_at: DateTime<Utc>,
}

impl SignatureVerification {
    /// Reduces a verifier report.
    ///
    /// Only the first signature's metadata is kept; validity is "any
    /// signature is valid".
    #[must_use]
    pub fn from_report(report: &VerificationReport, verified_at: DateTime<Utc>) -> Self {
        let first = report.signatures.first();

        let mut notes: Vec<String> = report
            .signatures
            .iter()
            .enumerate()
            .filter(|(_, sig)| sig.status != SignatureStatus::Valid)
            .map(|(idx, sig)| format!("signature #{} status: {:?}", idx + 1, sig.status))
            .collect();
        if report.signatures.is_empty() {
            notes.push("no embedded signature found".to_string());
        }

        Self {
            has_signature: !report.signatures.is_empty(),
            crypto_valid: report
                .signatures
                .iter()
                .any(|sig| sig.status == SignatureStatus::Valid),
            signer_subject: first
                .and_then(|sig| sig.signer.as_ref())
                .map(Signer::subject)
                .filter(|s| !s.is_empty()),
            signing_time: first.and_then(|sig| sig.signing_time),
            notes,
            verified_at,
        }
    }

    /// Both conditions required before a revocation can be approved.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.has_signature && self.crypto_valid
    }
}

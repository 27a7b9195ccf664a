//! Content identifier validation.
//!
//! Two address formats are accepted:
//! - CIDv0: `Qm` followed by 44 base58 characters (46 total)
//! - CIDv1: base32, `baf` prefix as produced by current IPFS tooling

use lazy_static::lazy_static;
use proteka_common::{ProtekaError, Result};
use regex::Regex;

lazy_static! {
    static ref CID_V0: Regex = Regex::new(r"^Qm[1-9A-HJ-NP-Za-km-z]{44}$").unwrap();
    static ref CID_V1: Regex = Regex::new(r"^baf[a-z2-7]{56,}$").unwrap();
}

/// Check a content identifier against both supported formats.
pub fn is_valid_cid(cid: &str) -> bool {
    CID_V0.is_match(cid) || CID_V1.is_match(cid)
}

/// Validate a content identifier, surfacing a validation error with the
/// offending value on mismatch.
pub fn validate_cid(cid: &str) -> Result<()> {
    if is_valid_cid(cid) {
        Ok(())
    } else {
        Err(ProtekaError::Validation(format!(
            "not a recognized content identifier: {:?}",
            cid
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_accepts_both_formats() {
        assert!(is_valid_cid(V0));
        assert!(is_valid_cid(V1));
        assert!(validate_cid(V0).is_ok());
        assert!(validate_cid(V1).is_ok());
    }

    #[test]
    fn test_rejects_empty_string() {
        assert!(!is_valid_cid(""));
        assert!(validate_cid("").is_err());
    }

    #[test]
    fn test_rejects_one_character_short() {
        let short_v0 = &V0[..V0.len() - 1];
        assert_eq!(short_v0.len(), 45);
        assert!(!is_valid_cid(short_v0));
    }

    #[test]
    fn test_rejects_wrong_alphabet() {
        // '0', 'O', 'I', 'l' are not in the base58 alphabet
        let bad = format!("Qm0OIl{}", &V0[6..]);
        assert_eq!(bad.len(), V0.len());
        assert!(!is_valid_cid(&bad));

        // Uppercase is not valid base32
        assert!(!is_valid_cid(&V1.to_uppercase()));
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        assert!(!is_valid_cid(&format!("Xm{}", &V0[2..])));
        assert!(!is_valid_cid("cafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"));
    }
}

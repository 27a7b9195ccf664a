pub mod categories;
pub mod chain;
pub mod dashboard;
pub mod ligands;
pub mod proteins;
pub mod stats;

/// Accessions are four characters, leading digit, alphanumeric.
pub fn is_valid_accession(id: &str) -> bool {
    id.len() == 4
        && id.chars().next().is_some_and(|c| c.is_ascii_digit())
        && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accession_validation() {
        assert!(is_valid_accession("1ABC"));
        assert!(is_valid_accession("6lu7"));
        assert!(!is_valid_accession(""));
        assert!(!is_valid_accession("ABCD"));
        assert!(!is_valid_accession("1AB"));
        assert!(!is_valid_accession("1ABCD"));
        assert!(!is_valid_accession("1AB!"));
    }
}

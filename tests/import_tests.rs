//! Black-box tests for instrument library imports (§10.3).

use gbscore::ast::InstrumentType;
use gbscore::imports::{merge_imports, Fetcher, ImportConfig, NullFetcher};
use gbscore::parse;
use pretty_assertions::assert_eq;

#[test]
fn null_fetcher_refuses_any_import_by_default() {
    let (mut score, _) = parse("import \"lib.score\"\n").unwrap();
    let err = merge_imports(&mut score, &NullFetcher, &ImportConfig::default());
    assert!(err.is_err());
}

struct FixedFetcher(Vec<u8>);

impl Fetcher for FixedFetcher {
    fn fetch(&self, _url: &str) -> gbscore::error::Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

#[test]
fn imported_instrument_is_merged_into_the_score() {
    let (mut score, _) = parse("import \"lib.score\"\n").unwrap();
    let fetcher = FixedFetcher(b"inst bell type=wave\n".to_vec());
    let warnings = merge_imports(&mut score, &fetcher, &ImportConfig::default()).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(score.instruments.get("bell").unwrap().kind, InstrumentType::Wave);
}

#[test]
fn local_import_path_with_traversal_is_rejected() {
    let (mut score, _) = parse("import \"../secrets.score\"\n").unwrap();
    let fetcher = FixedFetcher(b"inst x type=pulse1\n".to_vec());
    assert!(merge_imports(&mut score, &fetcher, &ImportConfig::default()).is_err());
}

//! # Instrument Imports
//!
//! `import "path"` lines name either a local file or a remote URL
//! (`https://...` or `github:user/repo/ref/path.ins`, expanded to its raw-file
//! URL). Resolving them is kept out of [`crate::parser`] entirely: fetching
//! is behind the injectable [`Fetcher`] trait so the parser/resolver stay
//! pure and testable without network or filesystem access.
//!
//! Merge semantics: later imports win on name collision (last-wins); a
//! colliding name also produces a [`Warning`] so authors notice the shadow.

use crate::ast::{AbstractScore, Instrument};
use crate::error::{GbscoreError, Result, Warning};
use crate::parser;
use std::collections::HashSet;

/// Resolves the bytes behind an import spec. Implementations decide what
/// `local path` vs `remote URL` means; the default, [`NullFetcher`], refuses
/// everything so library consumers must opt in.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// A [`Fetcher`] that refuses every request — the safe default for a
/// library that must not perform I/O unless the embedder asks it to.
pub struct NullFetcher;

impl Fetcher for NullFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Err(GbscoreError::Import {
            path: url.to_string(),
            cause: "no fetcher configured".to_string(),
        })
    }
}

/// A test double that serves fixed content for known paths, per
/// [`crate::imports`]'s ambient-stack test-tooling convention.
#[cfg(test)]
pub struct StaticFetcher(pub std::collections::HashMap<String, Vec<u8>>);

#[cfg(test)]
impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.0.get(url).cloned().ok_or_else(|| GbscoreError::Import {
            path: url.to_string(),
            cause: "not found in static fetcher".to_string(),
        })
    }
}

/// Import resolution policy (§10.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    pub allow_absolute: bool,
    pub https_only: bool,
    pub max_remote_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            allow_absolute: false,
            https_only: true,
            max_remote_bytes: 1024 * 1024,
        }
    }
}

fn is_remote(spec: &str) -> bool {
    spec.starts_with("https://") || spec.starts_with("http://") || spec.starts_with("github:")
}

fn expand_github_spec(spec: &str) -> Result<String> {
    // github:user/repo/ref/path.ins -> raw.githubusercontent.com/user/repo/ref/path.ins
    let rest = spec.strip_prefix("github:").ok_or_else(|| GbscoreError::Import {
        path: spec.to_string(),
        cause: "malformed github: import".to_string(),
    })?;
    let mut parts = rest.splitn(4, '/');
    let (user, repo, reference, path) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    );
    match (user, repo, reference, path) {
        (Some(u), Some(r), Some(g), Some(p)) if !u.is_empty() && !r.is_empty() && !p.is_empty() => {
            Ok(format!("https://raw.githubusercontent.com/{u}/{r}/{g}/{p}"))
        }
        _ => Err(GbscoreError::Import {
            path: spec.to_string(),
            cause: "expected github:user/repo/ref/path.ins".to_string(),
        }),
    }
}

fn validate_local_path(spec: &str, config: &ImportConfig) -> Result<()> {
    if spec.starts_with('/') && !config.allow_absolute {
        return Err(GbscoreError::Import {
            path: spec.to_string(),
            cause: "absolute paths are disabled by import policy".to_string(),
        });
    }
    if spec.split('/').any(|segment| segment == "..") {
        return Err(GbscoreError::Import {
            path: spec.to_string(),
            cause: "path traversal ('..') is not allowed".to_string(),
        });
    }
    Ok(())
}

fn fetch_one(spec: &str, fetcher: &dyn Fetcher, config: &ImportConfig) -> Result<Vec<u8>> {
    if is_remote(spec) {
        let url = if spec.starts_with("github:") {
            expand_github_spec(spec)?
        } else {
            spec.to_string()
        };
        if config.https_only && !url.starts_with("https://") {
            return Err(GbscoreError::Import {
                path: spec.to_string(),
                cause: "https-only import policy rejects a plain http:// URL".to_string(),
            });
        }
        let bytes = fetcher.fetch(&url)?;
        if bytes.len() as u64 > config.max_remote_bytes {
            tracing::warn!(spec, bytes = bytes.len(), cap = config.max_remote_bytes, "remote import skipped: exceeds size cap");
            return Err(GbscoreError::Import {
                path: spec.to_string(),
                cause: format!("remote content exceeds {} byte cap", config.max_remote_bytes),
            });
        }
        Ok(bytes)
    } else {
        validate_local_path(spec, config)?;
        fetcher.fetch(spec)
    }
}

/// Resolve and merge every `import` in `score`, fetching each with `fetcher`
/// and parsing its contents as a score fragment whose `instruments` table
/// gets merged into `score`'s (last-wins; remote fragments may not carry
/// their own nested imports). Returns warnings for any shadowed instrument
/// name.
pub fn merge_imports(
    score: &mut AbstractScore,
    fetcher: &dyn Fetcher,
    config: &ImportConfig,
) -> Result<Vec<Warning>> {
    let mut warnings = Vec::new();
    let mut visiting: HashSet<String> = HashSet::new();

    for spec in score.imports.clone() {
        if !visiting.insert(spec.clone()) {
            return Err(GbscoreError::Import {
                path: spec,
                cause: "cyclic import".to_string(),
            });
        }
        let bytes = fetch_one(&spec, fetcher, config)?;
        let text = String::from_utf8(bytes).map_err(|e| GbscoreError::Import {
            path: spec.clone(),
            cause: format!("not valid UTF-8: {e}"),
        })?;
        let (fragment, mut fragment_warnings) = parser::parse(&text)?;
        if !fragment.imports.is_empty() {
            tracing::warn!(spec = %spec, nested = fragment.imports.len(), "nested imports skipped");
            warnings.push(Warning::new(
                "import",
                format!("nested imports in '{spec}' are ignored (remote fragments may not import)"),
            ));
        }
        warnings.append(&mut fragment_warnings);
        merge_instruments(score, fragment.instruments, &spec, &mut warnings);
    }
    Ok(warnings)
}

fn merge_instruments(
    score: &mut AbstractScore,
    incoming: std::collections::HashMap<String, Instrument>,
    spec: &str,
    warnings: &mut Vec<Warning>,
) {
    for (name, instrument) in incoming {
        if score.instruments.contains_key(&name) {
            warnings.push(Warning::new(
                "import",
                format!("instrument '{name}' from '{spec}' shadows an existing definition"),
            ));
        }
        score.instruments.insert(name, instrument);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn null_fetcher_refuses_everything() {
        let err = NullFetcher.fetch("local.ins");
        assert!(err.is_err());
    }

    #[test]
    fn github_spec_expands_to_raw_url() {
        let url = expand_github_spec("github:alice/chiptunes/main/lead.ins").unwrap();
        assert_eq!(url, "https://raw.githubusercontent.com/alice/chiptunes/main/lead.ins");
    }

    #[test]
    fn absolute_paths_rejected_by_default() {
        let config = ImportConfig::default();
        assert!(validate_local_path("/etc/passwd", &config).is_err());
    }

    #[test]
    fn path_traversal_rejected() {
        let config = ImportConfig::default();
        assert!(validate_local_path("../../etc/passwd", &config).is_err());
    }

    #[test]
    fn https_only_rejects_plain_http() {
        let config = ImportConfig::default();
        let fetcher = StaticFetcher(HashMap::new());
        let err = fetch_one("http://example.com/lead.ins", &fetcher, &config);
        assert!(err.is_err());
    }

    #[test]
    fn remote_size_cap_is_enforced() {
        let mut config = ImportConfig::default();
        config.max_remote_bytes = 4;
        let mut files = HashMap::new();
        files.insert("https://example.com/lead.ins".to_string(), b"way too many bytes".to_vec());
        let fetcher = StaticFetcher(files);
        let err = fetch_one("https://example.com/lead.ins", &fetcher, &config);
        assert!(err.is_err());
    }

    #[test]
    fn merge_last_wins_and_warns_on_shadow() {
        let mut score = AbstractScore::default();
        score.instruments.insert("lead".to_string(), Instrument::new("lead", crate::ast::InstrumentType::Pulse1));
        score.imports.push("lib.score".to_string());

        let mut files = HashMap::new();
        files.insert(
            "lib.score".to_string(),
            b"inst lead type=pulse2\n".to_vec(),
        );
        let fetcher = StaticFetcher(files);
        let warnings = merge_imports(&mut score, &fetcher, &ImportConfig::default()).unwrap();
        assert_eq!(score.instruments["lead"].kind, crate::ast::InstrumentType::Pulse2);
        assert!(warnings.iter().any(|w| w.message.contains("shadows")));
    }
}

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

/// URI scheme prefixes the extractor recognizes
///
/// Extending this list is a code change, not runtime configuration; the
/// matching grammar is rebuilt from it when the extractor is constructed.
pub const ACCEPTED_SCHEMES: &[&str] = &["ss"];

/// Errors raised while building the extractor
///
/// A grammar that fails to compile is a programming defect, not a property of
/// any particular input, so construction is the only fallible step.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to compile server grammar: {0}")]
    Grammar(#[from] regex::Error),
}

/// Finds proxy-server connection strings inside free-form chat text
///
/// The extractor scans arbitrary, noisy, multi-line text (emoji, captions in
/// other languages, unrelated URI schemes) for tokens of the accepted-scheme
/// family and returns them stripped of any trailing path, query or fragment
/// decoration. It holds only the compiled grammar: extraction is a pure
/// function of its input and is safe to call concurrently.
#[derive(Debug, Clone)]
pub struct ServerExtractor {
    grammar: Regex,
}

impl ServerExtractor {
    /// Compiles the accepted-scheme grammar
    ///
    /// The grammar recognizes `<scheme>://<authorization>[@<host>:<port>]`
    /// where the authorization segment is a run of base64-alphabet characters
    /// plus optional `=` padding. A candidate must be preceded by whitespace
    /// or start-of-input, which keeps the matcher from firing inside tokens
    /// of unrelated schemes that merely end in an accepted prefix
    /// (`vmess://...` contains `ss://`).
    ///
    /// # Returns
    /// * `Result<ServerExtractor, ExtractorError>` - The extractor, or a
    ///   grammar compilation error that callers must treat as fatal
    pub fn new() -> Result<Self, ExtractorError> {
        let schemes = ACCEPTED_SCHEMES
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(
            r"(?:^|\s)(?P<server>(?:{schemes})://[A-Za-z0-9+/]+=*(?:@[^\s:]+:[0-9]+)?)"
        );
        trace!("Compiling server grammar: {}", pattern);
        let grammar = Regex::new(&pattern)?;

        Ok(Self { grammar })
    }

    /// Extracts every server connection string from the given text
    ///
    /// Candidates are returned in source order, duplicates preserved, each
    /// trimmed of surrounding whitespace and of any `/...`, `?...` or `#...`
    /// suffix following the authority. An empty vector means nothing matched.
    ///
    /// # Arguments
    /// * `text` - Raw message body or caption; may be empty or multi-byte
    ///
    /// # Returns
    /// * `Vec<String>` - Canonical connection strings in order of appearance
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut servers = Vec::new();

        for caps in self.grammar.captures_iter(text) {
            let matched = match caps.name("server") {
                Some(m) => m,
                None => continue,
            };
            let token = matched.as_str();

            // The host:port form self-terminates at the first non-digit after
            // the port, so whatever follows (emoji, `#fragment`, `/path`) is
            // already outside the match. The bare authorization-only form has
            // no such terminator and must stop at a hard boundary, otherwise
            // the input was some longer word that only resembles a key and
            // emitting a truncated token would be wrong.
            if !token.contains('@') && !Self::at_boundary(text, matched.end()) {
                trace!("Discarding partial candidate at offset {}", matched.start());
                continue;
            }

            debug!("Found server candidate: {}", token);
            servers.push(token.to_string());
        }

        debug!("Extraction complete: {} server(s) found", servers.len());
        servers
    }

    /// Checks whether the character at `pos` terminates a bare-form token
    ///
    /// End-of-input, whitespace, and the decoration introducers `/`, `?`,
    /// `#` are valid terminators; anything else invalidates the candidate.
    fn at_boundary(text: &str, pos: usize) -> bool {
        match text[pos..].chars().next() {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '/' | '?' | '#'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ServerExtractor {
        ServerExtractor::new().expect("grammar must compile")
    }

    #[test]
    fn test_empty_input() {
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn test_no_candidates() {
        let text = "just a normal chat message with a link https://example.com/page";
        assert!(extractor().extract(text).is_empty());
    }

    #[test]
    fn test_single_candidate_no_surrounding_text() {
        let text = "ss://YWJjZGVm@1.2.3.4:8388";
        assert_eq!(extractor().extract(text), vec![text.to_string()]);
    }

    #[test]
    fn test_fragment_is_stripped() {
        let servers = extractor().extract("ss://XYZ@1.2.3.4:5001#Label%20(note)");
        assert_eq!(servers, vec!["ss://XYZ@1.2.3.4:5001".to_string()]);
    }

    #[test]
    fn test_path_suffix_is_stripped() {
        let servers = extractor().extract("ss://XYZ@1.2.3.4:3306/Outline_Vpn%29");
        assert_eq!(servers, vec!["ss://XYZ@1.2.3.4:3306".to_string()]);
    }

    #[test]
    fn test_query_suffix_is_stripped() {
        let servers = extractor().extract("ss://XYZ@1.2.3.4:443?plugin=obfs");
        assert_eq!(servers, vec!["ss://XYZ@1.2.3.4:443".to_string()]);
    }

    #[test]
    fn test_bare_form_with_padding() {
        let servers = extractor().extract("ss://QUJDREVG=#Label");
        assert_eq!(servers, vec!["ss://QUJDREVG=".to_string()]);
    }

    #[test]
    fn test_bare_form_at_end_of_input() {
        let servers = extractor().extract("key incoming:\nss://QUJDREVGRw==");
        assert_eq!(servers, vec!["ss://QUJDREVGRw==".to_string()]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let text = "ss://AAAA@1.1.1.1:80 then ss://BBBB@2.2.2.2:81\nss://AAAA@1.1.1.1:80";
        let servers = extractor().extract(text);
        assert_eq!(
            servers,
            vec![
                "ss://AAAA@1.1.1.1:80".to_string(),
                "ss://BBBB@2.2.2.2:81".to_string(),
                "ss://AAAA@1.1.1.1:80".to_string(),
            ]
        );
    }

    #[test]
    fn test_unrelated_scheme_is_ignored() {
        let text = "vmess://eyJhZGQiOiAiMS4yLjMuNCJ9\nss://QUJD@1.2.3.4:8080#uk";
        let servers = extractor().extract(text);
        assert_eq!(servers, vec!["ss://QUJD@1.2.3.4:8080".to_string()]);
    }

    #[test]
    fn test_unrelated_scheme_adjacent_on_same_line() {
        let text = "vmess://eyJhZGQifQ== ss://QUJD@1.2.3.4:8080";
        let servers = extractor().extract(text);
        assert_eq!(servers, vec!["ss://QUJD@1.2.3.4:8080".to_string()]);
    }

    #[test]
    fn test_indented_candidate_has_no_leading_whitespace() {
        let text = "\n\n    ss://QUJDREVG=\nsome trailing caption";
        let servers = extractor().extract(text);
        assert_eq!(servers, vec!["ss://QUJDREVG=".to_string()]);
    }

    #[test]
    fn test_emoji_directly_after_port_terminates_token() {
        let servers = extractor().extract("ss://QUJD@1.2.3.4:443🇬🇧 britain");
        assert_eq!(servers, vec!["ss://QUJD@1.2.3.4:443".to_string()]);
    }

    #[test]
    fn test_bare_form_followed_by_foreign_character_is_rejected() {
        // `_` is outside the authorization alphabet and is not a boundary, so
        // no truncated token may be emitted.
        assert!(extractor().extract("ss://abc_def").is_empty());
    }

    #[test]
    fn test_userinfo_without_port_is_rejected() {
        // `@host` without `:port` is neither a complete authority nor a
        // validly terminated bare form.
        assert!(extractor().extract("ss://QUJD@example.com").is_empty());
    }

    #[test]
    fn test_scheme_prefix_alone_is_rejected() {
        assert!(extractor().extract("ss:// is how the keys start").is_empty());
    }

    #[test]
    fn test_corpus_message_yields_six_servers() {
        let sample = "\nss://YWVzLTI1Ni1nY206WTZSOXBBdHZ4eHptR0M@54.36.174.181:5001#Britain501%20%28t.me/Outline_Vpn%29\nOther text\n🇬🇧 #Britain\n\nss://YWVzLTI1Ni1nY206cEtFVzhKUEJ5VFZUTHRN@54.36.174.181:4444#Britain502%20%28t.me/Outline_Vpn%29\nDefinitely not clean\n🇬🇧 #Britain\n\nss://YWVzLTI1Ni1nY206WTZSOXBBdHZ4eHptR0M@54.36.174.181:3306/Outline_Vpn%29\n\n🇬🇧 #Britain\n\nss://YWVzLTI1Ni1nY206ZmFCQW9ENTRrODdVSkc3@54.36.174.181:2376#Britain504%20%28t.me\n\n🇬🇧 #Britain\n\nss://YWVzLTI1Ni1nY206UENubkg2U1FTbmZvUzI3QDUuMzkuNzAuMTM4OjgwOTA=#FrOutlineKeys\n\nss://YWVzLTI1Ni1nY206S2l4THZLendqZWtHMDBybQ==@ak1394.free.www.outline.network:8080#www.outline.network%20(japan)\n";

        let servers = extractor().extract(sample);
        assert_eq!(
            servers,
            vec![
                "ss://YWVzLTI1Ni1nY206WTZSOXBBdHZ4eHptR0M@54.36.174.181:5001".to_string(),
                "ss://YWVzLTI1Ni1nY206cEtFVzhKUEJ5VFZUTHRN@54.36.174.181:4444".to_string(),
                "ss://YWVzLTI1Ni1nY206WTZSOXBBdHZ4eHptR0M@54.36.174.181:3306".to_string(),
                "ss://YWVzLTI1Ni1nY206ZmFCQW9ENTRrODdVSkc3@54.36.174.181:2376".to_string(),
                "ss://YWVzLTI1Ni1nY206UENubkg2U1FTbmZvUzI3QDUuMzkuNzAuMTM4OjgwOTA=".to_string(),
                "ss://YWVzLTI1Ni1nY206S2l4THZLendqZWtHMDBybQ==@ak1394.free.www.outline.network:8080"
                    .to_string(),
            ]
        );
    }
}

//! Domain normalization and detection.
//!
//! Provider answers mention sites in many shapes (`https://www.Acme.com/x`,
//! `acme.com.`, `[Acme](acme.com)`), so every comparison between domains goes
//! through [`normalize_domain`].

use url::Url;

/// File extensions that look like top-level domains but are not.
const FILE_EXTENSIONS: &[&str] = &[
    "html", "htm", "php", "asp", "aspx", "js", "ts", "json", "xml", "md", "txt", "pdf", "png",
    "jpg", "jpeg", "gif", "svg", "css", "csv", "exe", "zip",
];

/// Normalize a URL, origin or bare host into a lowercase domain.
///
/// Inputs without a scheme are parsed as `https://` URLs, so only the
/// leading host counts even when the query embeds another URL. A leading
/// `www.` and a trailing dot are dropped. Returns an empty string when no
/// host can be parsed.
pub fn normalize_domain(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    let host = parse_host(input).or_else(|| parse_host(&format!("https://{}", input)));
    let Some(host) = host else {
        return String::new();
    };

    let host = host.trim_end_matches('.').to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// Host of `input` if it parses as an absolute URL with a host.
///
/// `acme.com:8080` parses with the scheme `acme.com` and no host, so it
/// falls through to the `https://` retry.
fn parse_host(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Whether `candidate` is the target site or one of its subdomains.
///
/// Both arguments are normalized before comparison.
pub fn is_same_site(candidate: &str, target: &str) -> bool {
    let candidate = normalize_domain(candidate);
    let target = normalize_domain(target);
    if target.is_empty() {
        return false;
    }
    candidate == target || candidate.ends_with(&format!(".{}", target))
}

/// Whether an already-normalized string looks like a registrable domain.
pub fn looks_like_domain(candidate: &str) -> bool {
    if candidate.len() < 4 || candidate.len() > 253 || !candidate.contains('.') {
        return false;
    }

    let labels: Vec<&str> = candidate.split('.').collect();
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    let tld = labels[labels.len() - 1];
    tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && !FILE_EXTENSIONS.contains(&tld)
}

/// Find every domain mentioned in a piece of text, in order of appearance.
///
/// Repeated mentions are returned once.
pub fn find_domains(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    let tokens = text.split(|c: char| {
        c.is_whitespace()
            || matches!(
                c,
                '(' | ')' | '[' | ']' | '<' | '>' | '"' | '\'' | ',' | ';' | '!' | '?' | '*'
                    | '`' | '|' | '{' | '}'
            )
    });

    for token in tokens {
        let token = token.trim_end_matches(['.', ':']);
        if token.is_empty() {
            continue;
        }
        // Bare "word:" tokens and e-mail addresses are not citations.
        if token.contains('@') && !token.contains("://") {
            continue;
        }

        let domain = normalize_domain(token);
        if looks_like_domain(&domain) && !found.contains(&domain) {
            found.push(domain);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("https://www.Example.com/pricing?x=1"), "example.com");
        assert_eq!(normalize_domain("acme.com."), "acme.com");
        assert_eq!(normalize_domain("http://user:pw@shop.acme.io:8080/"), "shop.acme.io");
        assert_eq!(normalize_domain("  Beta.IO  "), "beta.io");
        assert_eq!(normalize_domain("example.com#top"), "example.com");
        assert_eq!(normalize_domain("acme.com:8080/path"), "acme.com");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn test_normalize_domain_ignores_embedded_urls() {
        assert_eq!(
            normalize_domain("acme.com/go?to=https://beta.io"),
            "acme.com"
        );
        assert_eq!(
            normalize_domain("https://acme.com/redirect?url=http://www.beta.io/"),
            "acme.com"
        );
        assert!(!is_same_site("acme.com/go?to=https://example.com", "example.com"));
    }

    #[test]
    fn test_is_same_site() {
        assert!(is_same_site("https://blog.example.com/post", "example.com"));
        assert!(is_same_site("www.example.com", "https://example.com"));
        assert!(!is_same_site("notexample.com", "example.com"));
        assert!(!is_same_site("acme.com", ""));
    }

    #[test]
    fn test_looks_like_domain() {
        assert!(looks_like_domain("acme.com"));
        assert!(looks_like_domain("docs.rust-lang.org"));
        assert!(!looks_like_domain("e.g"));
        assert!(!looks_like_domain("3.14"));
        assert!(!looks_like_domain("index.html"));
        assert!(!looks_like_domain("-bad.com"));
        assert!(!looks_like_domain("nodot"));
    }

    #[test]
    fn test_find_domains_in_prose() {
        let text = "Popular options include [Acme](https://acme.com/crm), beta.io and \
                    (www.gamma.dev). Acme.com is the cheapest, e.g. for startups.";
        assert_eq!(find_domains(text), vec!["acme.com", "beta.io", "gamma.dev"]);
    }

    #[test]
    fn test_find_domains_ignores_emails() {
        assert!(find_domains("Contact sales@acme.com for details").is_empty());
    }
}

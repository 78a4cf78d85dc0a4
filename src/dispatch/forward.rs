//! Forwarding sender rewrite.
//!
//! When relaying from a non-local sender to a non-local recipient, the
//! outgoing envelope sender is rewritten to a local-domain return path that
//! embeds the original sender, so the relay is SPF-safe while still
//! preserving bounce routing.

/// Splits `addr` into `(user, domain)` on the last `@`. Address parsing goes
/// no further than this — the core only needs the user/domain split for the
/// rewrite rule and for local-domain routing.
#[must_use]
pub fn split_user_domain(addr: &str) -> Option<(&str, &str)> {
    let at = addr.rfind('@')?;
    Some((&addr[..at], &addr[at + 1..]))
}

/// IDNA-ASCII conversion of a domain, falling back to the original string
/// if conversion fails.
///
/// On success this returns the IDNA-ASCII form; on failure it falls back to
/// the original string unchanged.
#[must_use]
pub fn idna_ascii(domain: &str) -> String {
    match idna::domain_to_ascii(domain) {
        Ok(ascii) => ascii,
        Err(_) => domain.to_string(),
    }
}

/// Builds the rewritten envelope sender for a forwarded, non-local-to-non-local
/// delivery:
///
/// `<local_user>+fwd_from=<escaped_from>@<idna_ascii(original_recipient_domain)>`
///
/// `local_user` and `original_recipient_domain` come from the recipient's
/// `original_address` (the alias that was matched); `escaped_from` is
/// `item.from` with every `@` replaced by `=`.
#[must_use]
pub fn rewrite_sender(original_from: &str, recipient_original_address: &str) -> Option<String> {
    let (local_user, original_domain) = split_user_domain(recipient_original_address)?;
    let escaped_from = original_from.replace('@', "=");
    let domain = idna_ascii(original_domain);
    Some(format!("{local_user}+fwd_from={escaped_from}@{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_user_and_domain_on_last_at() {
        assert_eq!(split_user_domain("a@b@c.com"), Some(("a@b", "c.com")));
        assert_eq!(split_user_domain("a@local"), Some(("a", "local")));
        assert_eq!(split_user_domain("no-at"), None);
    }

    #[test]
    fn idna_falls_back_to_original_on_failure() {
        // A domain label containing an invalid character for IDNA to reject.
        let weird = "exa\u{0000}mple.com";
        let out = idna_ascii(weird);
        assert_eq!(out, weird);
    }

    #[test]
    fn idna_converts_unicode_domains() {
        let out = idna_ascii("bücher.example");
        assert!(out.starts_with("xn--"));
    }

    #[test]
    fn idna_passes_through_plain_ascii() {
        assert_eq!(idna_ascii("example.com"), "example.com");
    }

    #[test]
    fn rewrite_matches_the_normative_format() {
        // recipient `b@remote` was originally `fwd@local`, and the
        // envelope's sender is `x@otherremote`.
        let rewritten = rewrite_sender("x@otherremote", "fwd@local").unwrap();
        assert_eq!(rewritten, "fwd+fwd_from=x=otherremote@local");
    }

    #[test]
    fn rewrite_escapes_every_at_sign_in_from() {
        let rewritten = rewrite_sender("a@b@c", "fwd@local").unwrap();
        assert_eq!(rewritten, "fwd+fwd_from=a=b=c@local");
    }

    #[test]
    fn rewrite_returns_none_for_unparseable_original_address() {
        assert_eq!(rewrite_sender("x@otherremote", "not-an-address"), None);
    }
}

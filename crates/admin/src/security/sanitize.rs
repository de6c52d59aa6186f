//! Untrusted-input sanitizers and attack-pattern detection.
//!
//! Every sanitizer is a total function: any input maps to a safe string,
//! never an error. All sanitizers are idempotent - pattern removal runs to a
//! fixpoint, so fragments that would reassemble into a hostile token after
//! one removal pass (e.g. `<scr<script>ipt>`) are removed too.
//!
//! [`detect_attack`] is a separate deny-by-pattern gate over the *raw* input.
//! Callers must reject the submission when it fires rather than silently
//! sanitizing; a blocklist regex is not a substitute for parameterized
//! queries at the backend, but it stops the obvious probes at the door.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of free-form text fields.
pub const TEXT_MAX: usize = 1000;
/// Maximum length of a product name.
pub const NAME_MAX: usize = 200;
/// Maximum length of a product description.
pub const DESCRIPTION_MAX: usize = 5000;
/// Maximum length of a price string.
pub const PRICE_MAX: usize = 10;
/// Maximum length of a URL.
pub const URL_MAX: usize = 2000;
/// Maximum length of an email address (RFC 5321).
pub const EMAIL_MAX: usize = 254;
/// Maximum length of a category name.
pub const CATEGORY_MAX: usize = 100;

/// `javascript:`, `data:` and `vbscript:` protocol prefixes.
static DANGEROUS_PROTOCOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:javascript|data|vbscript)\s*:").expect("Invalid regex"));

/// Inline event-handler attributes (`onload=`, `onclick=`, ...).
static EVENT_HANDLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\w+\s*=").expect("Invalid regex"));

/// Complete `<script>...</script>` blocks, non-greedy, case-insensitive.
static SCRIPT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("Invalid regex"));

/// Complete `<iframe>...</iframe>` blocks, non-greedy, case-insensitive.
static IFRAME_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe\s*>").expect("Invalid regex"));

/// Unpaired `<script>`/`<iframe>` open or close tags left after block removal.
static ORPHAN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:script|iframe)\b[^>]*>").expect("Invalid regex"));

/// `http://` or `https://` URL prefix.
static HTTP_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("Invalid regex"));

/// Schemes that must never appear at the start of a URL.
static FORBIDDEN_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:javascript|data|vbscript):").expect("Invalid regex"));

/// Attack signatures checked by [`detect_attack`] against raw input.
static ATTACK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // XSS
        r"(?i)<script",
        r"(?i)javascript\s*:",
        r"(?i)\bon\w+\s*=",
        // SQL injection
        r"(?i)union\s+select",
        r"(?i)drop\s+table",
        r"(?i)delete\s+from",
        r"(?i)'\s*or\s*'1'\s*=\s*'1",
        r"--\s*$",
        r"(?s)/\*.*?\*/",
        // Template interpolation
        r"\$\{[^}]*\}",
        r"\{\{[^}]*\}\}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

/// Truncate to at most `max` characters, on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Apply each regex in order, repeating until no pattern matches anywhere.
///
/// A single pass is not enough: removing one match can splice the surrounding
/// text into a new match.
fn strip_to_fixpoint(patterns: &[&Regex], input: &str) -> String {
    let mut current = input.to_owned();
    loop {
        let mut next = current.clone();
        for re in patterns {
            next = re.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Sanitize free-form text: strips angle brackets, dangerous protocol
/// prefixes, and inline event-handler patterns; trims; truncates to
/// [`TEXT_MAX`] characters.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    let without_angles = input.replace(['<', '>'], "");
    let cleaned = strip_to_fixpoint(
        &[&DANGEROUS_PROTOCOL_RE, &EVENT_HANDLER_RE],
        &without_angles,
    );
    truncate_chars(&cleaned, TEXT_MAX).trim().to_owned()
}

/// Sanitize a product name: [`sanitize_text`] rules plus quote, backtick,
/// semicolon, and backslash stripping; truncates to [`NAME_MAX`] characters.
#[must_use]
pub fn sanitize_name(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '`' | ';' | '\\'))
        .collect();
    let cleaned = strip_to_fixpoint(&[&DANGEROUS_PROTOCOL_RE, &EVENT_HANDLER_RE], &stripped);
    truncate_chars(&cleaned, NAME_MAX).trim().to_owned()
}

/// Sanitize a product description.
///
/// Removes entire `<script>`/`<iframe>` blocks (content included) and
/// dangerous protocol prefixes, then truncates to [`DESCRIPTION_MAX`]
/// characters. Other markup is permitted - descriptions are rich text.
#[must_use]
pub fn sanitize_description(input: &str) -> String {
    let cleaned = strip_to_fixpoint(
        &[
            &SCRIPT_BLOCK_RE,
            &IFRAME_BLOCK_RE,
            &ORPHAN_TAG_RE,
            &DANGEROUS_PROTOCOL_RE,
        ],
        input,
    );
    truncate_chars(&cleaned, DESCRIPTION_MAX).trim().to_owned()
}

/// Sanitize a price string: keeps only digits and dots; if more than one dot
/// is present, everything after the first dot collapses into a single
/// fractional part (`"12.34.56"` becomes `"12.3456"`); truncates to
/// [`PRICE_MAX`] characters.
#[must_use]
pub fn sanitize_price(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let normalized = match cleaned.split_once('.') {
        Some((whole, rest)) => {
            let fraction: String = rest.chars().filter(char::is_ascii_digit).collect();
            format!("{whole}.{fraction}")
        }
        None => cleaned,
    };

    truncate_chars(&normalized, PRICE_MAX)
}

/// Sanitize a URL.
///
/// Returns the trimmed URL only when it starts with `http://` or `https://`
/// and does not start with a forbidden scheme; anything else maps to the
/// empty string. Truncates to [`URL_MAX`] characters.
#[must_use]
pub fn sanitize_url(input: &str) -> String {
    let trimmed = input.trim();
    if !HTTP_URL_RE.is_match(trimmed) || FORBIDDEN_SCHEME_RE.is_match(trimmed) {
        return String::new();
    }
    truncate_chars(trimmed, URL_MAX)
}

/// Sanitize an email address: lower-cases, strips quotes, backticks,
/// semicolons, and backslashes, trims, truncates to [`EMAIL_MAX`] characters.
///
/// Structural validation (`@`-shape, non-empty parts) is a separate step via
/// `clementine_core::Email::parse`.
#[must_use]
pub fn sanitize_email(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | ';' | '\\'))
        .collect();
    truncate_chars(&stripped, EMAIL_MAX).trim().to_owned()
}

/// Sanitize a category name: strips quotes, backticks, semicolons, and
/// backslashes, trims, truncates to [`CATEGORY_MAX`] characters.
#[must_use]
pub fn sanitize_category(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | ';' | '\\'))
        .collect();
    truncate_chars(&stripped, CATEGORY_MAX).trim().to_owned()
}

/// Returns true when the raw input matches any known attack signature.
///
/// Checked signatures: script-tag open, `javascript:` protocol, inline event
/// handlers, `UNION SELECT`, `DROP TABLE`, `DELETE FROM`, the classic
/// `' OR '1'='1` probe, trailing `--` comments, `/* */` block comments, and
/// `${...}` / `{{...}}` template interpolation.
///
/// Callers must reject the submission outright when this returns true;
/// sanitizing and proceeding would hide the probe instead of surfacing it.
#[must_use]
pub fn detect_attack(input: &str) -> bool {
    let hit = ATTACK_PATTERNS.iter().find(|re| re.is_match(input));
    if let Some(re) = hit {
        tracing::warn!(pattern = re.as_str(), "attack signature detected in input");
        return true;
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // =========================================================================
    // sanitize_text / sanitize_name
    // =========================================================================

    #[test]
    fn test_text_strips_angle_brackets() {
        assert_eq!(sanitize_text("<b>bold</b>"), "bbold/b");
        assert_eq!(sanitize_text("a < b > c"), "a  b  c");
    }

    #[test]
    fn test_text_strips_protocols_and_handlers() {
        assert_eq!(sanitize_text("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_text("data:text/html"), "text/html");
        assert_eq!(sanitize_text("x onload=evil()"), "x evil()");
    }

    #[test]
    fn test_text_truncates() {
        let long = "a".repeat(2000);
        assert_eq!(sanitize_text(&long).len(), TEXT_MAX);
    }

    #[test]
    fn test_name_strips_quotes_and_semicolons() {
        assert_eq!(sanitize_name("Shoe\"; DROP--"), "Shoe DROP--");
        assert_eq!(sanitize_name("it's a `name`\\"), "its a name");
    }

    #[test]
    fn test_name_spliced_protocol_removed() {
        // The semicolon strip splices "java;script:" into "javascript:",
        // which the fixpoint pass then removes.
        assert_eq!(sanitize_name("java;script:alert"), "alert");
    }

    // =========================================================================
    // sanitize_description
    // =========================================================================

    #[test]
    fn test_description_removes_script_blocks() {
        assert_eq!(
            sanitize_description("before<script>alert(1)</script>after"),
            "beforeafter"
        );
        assert_eq!(
            sanitize_description("a<SCRIPT src=x>payload</SCRIPT>b"),
            "ab"
        );
    }

    #[test]
    fn test_description_removes_iframe_blocks() {
        assert_eq!(
            sanitize_description("x<iframe src=\"evil\">inner</iframe>y"),
            "xy"
        );
    }

    #[test]
    fn test_description_removes_nested_reassembly() {
        // Removing the inner block must not leave a working outer block.
        let tricky = "<scr<script>x</script>ipt>alert(1)</script>";
        let result = sanitize_description(tricky);
        assert!(!result.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_description_removes_unclosed_script_tag() {
        let result = sanitize_description("text <script src=x> more");
        assert!(!result.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_description_permits_other_markup() {
        assert_eq!(
            sanitize_description("<p>hello <b>world</b></p>"),
            "<p>hello <b>world</b></p>"
        );
    }

    // =========================================================================
    // sanitize_price
    // =========================================================================

    #[test]
    fn test_price_collapses_extra_dots() {
        assert_eq!(sanitize_price("12.34.56"), "12.3456");
    }

    #[test]
    fn test_price_strips_non_numeric() {
        assert_eq!(sanitize_price("abc99.9"), "99.9");
        assert_eq!(sanitize_price("$19.99"), "19.99");
    }

    #[test]
    fn test_price_truncates_to_ten() {
        assert_eq!(sanitize_price("12345678901234").len(), PRICE_MAX);
    }

    #[test]
    fn test_price_empty_input() {
        assert_eq!(sanitize_price(""), "");
        assert_eq!(sanitize_price("no digits"), "");
    }

    // =========================================================================
    // sanitize_url
    // =========================================================================

    #[test]
    fn test_url_rejects_non_http() {
        assert_eq!(sanitize_url("ftp://x"), "");
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("not a url"), "");
    }

    #[test]
    fn test_url_accepts_http_and_https() {
        assert_eq!(
            sanitize_url("https://example.com/pay"),
            "https://example.com/pay"
        );
        assert_eq!(sanitize_url("http://example.com"), "http://example.com");
        assert_eq!(
            sanitize_url("  https://example.com  "),
            "https://example.com"
        );
    }

    // =========================================================================
    // sanitize_email / sanitize_category
    // =========================================================================

    #[test]
    fn test_email_lowercases_and_strips() {
        assert_eq!(sanitize_email("Owner@Example.COM"), "owner@example.com");
        assert_eq!(sanitize_email("o'brien;@x.com"), "obrien@x.com");
    }

    #[test]
    fn test_category_strips_and_truncates() {
        assert_eq!(sanitize_category("shoes; boots"), "shoes boots");
        assert_eq!(sanitize_category(&"c".repeat(300)).len(), CATEGORY_MAX);
    }

    // =========================================================================
    // Idempotency
    // =========================================================================

    #[test]
    fn test_all_sanitizers_idempotent() {
        let nasty_inputs = [
            "<script>alert(1)</script>",
            "<scr<script>x</script>ipt>alert</script>",
            "java;script:alert(1)",
            "oonload=nload=x",
            "  padded <b>text</b>  ",
            "12.34.56",
            "https://example.com/pay?a=1",
            "O'Brien\"; DROP TABLE users --",
            "{{template}} and ${interp}",
            "",
        ];

        for input in nasty_inputs {
            for f in [
                sanitize_text,
                sanitize_name,
                sanitize_description,
                sanitize_price,
                sanitize_url,
                sanitize_email,
                sanitize_category,
            ] {
                let once = f(input);
                let twice = f(&once);
                assert_eq!(once, twice, "not idempotent for input {input:?}");
            }
        }
    }

    // =========================================================================
    // detect_attack
    // =========================================================================

    #[test]
    fn test_detect_attack_xss() {
        assert!(detect_attack("<script>alert(1)</script>"));
        assert!(detect_attack("javascript:alert(1)"));
        assert!(detect_attack("<img onerror=evil()>"));
    }

    #[test]
    fn test_detect_attack_sql() {
        assert!(detect_attack("1 UNION SELECT * FROM users"));
        assert!(detect_attack("x; DROP TABLE products"));
        assert!(detect_attack("DELETE FROM carts WHERE 1=1"));
        assert!(detect_attack("' OR '1'='1"));
        assert!(detect_attack("admin'--"));
        assert!(detect_attack("x /* comment */ y"));
    }

    #[test]
    fn test_detect_attack_template_interpolation() {
        assert!(detect_attack("${7*7}"));
        assert!(detect_attack("{{constructor.constructor}}"));
    }

    #[test]
    fn test_detect_attack_clean_input() {
        assert!(!detect_attack("Blue suede shoes"));
        assert!(!detect_attack("owner@example.com"));
        assert!(!detect_attack("A perfectly normal description."));
        assert!(!detect_attack("price is 19.99"));
    }
}

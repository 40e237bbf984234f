use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 30;
const EMAIL_MAX_LEN: usize = 254;

pub const GENERATED_PASSWORD_LEN: usize = 16;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{}";

// Matched as case-insensitive substrings, so "MyPassword1!" is rejected too
const PASSWORD_DENYLIST: &[&str] = &[
    "password",
    "12345678",
    "qwerty",
    "letmein",
    "abc123",
    "iloveyou",
    "gymdesk",
];

const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "superuser",
    "system",
    "support",
    "api",
    "guest",
];

// Frequent misspellings of the big mail providers
const EMAIL_TYPO_MAP: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gamil.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmal.com", "hotmail.com"),
    ("yaho.com", "yahoo.com"),
    ("yahooo.com", "yahoo.com"),
    ("outlok.com", "outlook.com"),
];

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

#[derive(Debug, Clone)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UsernameCheck {
    pub is_valid: bool,
    /// Trimmed and lowercased form, present whether or not it validated
    pub username: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailCheck {
    pub is_valid: bool,
    pub error: Option<String>,
    /// Corrected address when the domain looks like a known misspelling
    pub suggestion: Option<String>,
}

/// Check a password against the strength policy. Every violated rule
/// contributes exactly one entry to `errors`, so the caller can show the
/// complete list at once.
pub fn validate_password_strength(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < PASSWORD_MIN_LEN {
        errors.push(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        ));
    }

    if length > PASSWORD_MAX_LEN {
        errors.push(format!(
            "Password must be at most {} characters long",
            PASSWORD_MAX_LEN
        ));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        errors.push("Password must contain at least one special character".to_string());
    }

    if has_repeated_run(password) {
        errors.push("Password must not repeat the same character three or more times in a row".to_string());
    }

    let lowered = password.to_lowercase();
    if PASSWORD_DENYLIST.iter().any(|word| lowered.contains(word)) {
        errors.push("Password contains a sequence that is too easy to guess".to_string());
    }

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn has_repeated_run(s: &str) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0;

    for c in s.chars() {
        if Some(c) == prev {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            prev = Some(c);
            run = 1;
        }
    }

    false
}

/// Validate a username. Input is trimmed and lowercased first; the
/// normalized form is what gets stored.
pub fn validate_username(username: &str) -> UsernameCheck {
    let normalized = username.trim().to_lowercase();

    let error = if normalized.len() < USERNAME_MIN_LEN || normalized.len() > USERNAME_MAX_LEN {
        Some(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        ))
    } else if !normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Some("Username may only contain letters, numbers and underscores".to_string())
    } else if RESERVED_USERNAMES.contains(&normalized.as_str()) {
        Some("This username is reserved".to_string())
    } else {
        None
    };

    UsernameCheck {
        is_valid: error.is_none(),
        username: normalized,
        error,
    }
}

/// Validate an email address shape. Deliverability is not checked. With
/// `suggest` set, well-known domain misspellings produce a corrected
/// address alongside a valid result.
pub fn validate_email(email: &str, suggest: bool) -> EmailCheck {
    let email = email.trim();

    if email.is_empty() || email.len() > EMAIL_MAX_LEN {
        return EmailCheck {
            is_valid: false,
            error: Some(format!(
                "Email must be between 1 and {} characters",
                EMAIL_MAX_LEN
            )),
            suggestion: None,
        };
    }

    if !EMAIL_REGEX.is_match(email) {
        return EmailCheck {
            is_valid: false,
            error: Some("Email address is not valid".to_string()),
            suggestion: None,
        };
    }

    let suggestion = if suggest {
        suggest_correction(email)
    } else {
        None
    };

    EmailCheck {
        is_valid: true,
        error: None,
        suggestion,
    }
}

fn suggest_correction(email: &str) -> Option<String> {
    let (local, domain) = email.rsplit_once('@')?;
    let lowered = domain.to_lowercase();

    EMAIL_TYPO_MAP
        .iter()
        .find(|(typo, _)| *typo == lowered)
        .map(|(_, fixed)| format!("{}@{}", local, fixed))
}

/// Entity-escape characters with meaning in HTML so stored strings render
/// inert wherever they end up. Empty input stays empty.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }

    out
}

/// Generate a random password with at least one character from each class.
/// Lengths under the policy minimum are raised to it, and the output always
/// satisfies `validate_password_strength`.
pub fn generate_secure_password(length: usize) -> String {
    let length = length.max(PASSWORD_MIN_LEN);

    loop {
        let candidate = random_password(length);

        // A shuffle can land identical characters next to each other, so
        // the occasional candidate fails the run rule. Retry; in practice
        // one draw almost always suffices.
        if validate_password_strength(&candidate).is_valid {
            return candidate;
        }
    }
}

fn random_password(length: usize) -> String {
    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SPECIAL].concat();

    let mut chars: Vec<u8> = Vec::with_capacity(length);

    // One guaranteed character per class
    chars.push(UPPERCASE[OsRng.gen_range(0..UPPERCASE.len())]);
    chars.push(LOWERCASE[OsRng.gen_range(0..LOWERCASE.len())]);
    chars.push(DIGITS[OsRng.gen_range(0..DIGITS.len())]);
    chars.push(SPECIAL[OsRng.gen_range(0..SPECIAL.len())]);

    while chars.len() < length {
        chars.push(all[OsRng.gen_range(0..all.len())]);
    }

    // Guaranteed characters must not sit at fixed positions
    chars.shuffle(&mut OsRng);

    String::from_utf8(chars).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_class_yields_exactly_one_error() {
        let no_lower = validate_password_strength("ABCDEF1!X2");
        assert!(!no_lower.is_valid);
        assert_eq!(no_lower.errors.len(), 1);
        assert!(no_lower.errors[0].contains("lowercase"));

        let no_upper = validate_password_strength("abcdef1!x2");
        assert_eq!(no_upper.errors.len(), 1);
        assert!(no_upper.errors[0].contains("uppercase"));

        let no_digit = validate_password_strength("Abcdefgh!x");
        assert_eq!(no_digit.errors.len(), 1);
        assert!(no_digit.errors[0].contains("number"));

        let no_special = validate_password_strength("Abcdefgh1x");
        assert_eq!(no_special.errors.len(), 1);
        assert!(no_special.errors[0].contains("special"));
    }

    #[test]
    fn short_password_reports_length_only() {
        let check = validate_password_strength("Ab1!");
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("at least 8"));
    }

    #[test]
    fn overlong_password_rejected() {
        let long = format!("Ab1!{}", "xyzw".repeat(32));
        let check = validate_password_strength(&long);
        assert!(!check.is_valid);
        assert!(check.errors.iter().any(|e| e.contains("at most 128")));
    }

    #[test]
    fn repeated_run_rejected() {
        let check = validate_password_strength("Gooood!Pass1");
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("three or more"));

        // Two in a row is fine
        assert!(validate_password_strength("Good!Pass12").is_valid);
    }

    #[test]
    fn denylisted_substring_rejected() {
        let check = validate_password_strength("MyPassword1!");
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("easy to guess"));

        // Case-insensitive
        assert!(!validate_password_strength("QWERTY!abc1").is_valid);
    }

    #[test]
    fn multiple_violations_all_reported() {
        // Too short and missing three classes
        let check = validate_password_strength("abc");
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 4);
    }

    #[test]
    fn strong_password_accepted() {
        let check = validate_password_strength("Str0ng&Safe");
        assert!(check.is_valid);
        assert!(check.errors.is_empty());
    }

    #[test]
    fn username_is_normalized() {
        let check = validate_username("  FrontDesk_1  ");
        assert!(check.is_valid);
        assert_eq!(check.username, "frontdesk_1");
        assert!(check.error.is_none());

        assert!(validate_username("pjb").is_valid);
    }

    #[test]
    fn username_rules() {
        assert!(!validate_username("ab").is_valid);
        assert!(!validate_username(&"a".repeat(31)).is_valid);
        assert!(validate_username(&"a".repeat(30)).is_valid);
        assert!(!validate_username("bad name").is_valid);
        assert!(!validate_username("bad-name").is_valid);
        assert!(!validate_username("ümlaut99").is_valid);
    }

    #[test]
    fn reserved_usernames_rejected() {
        for name in ["admin", "Admin", " ROOT ", "superuser"] {
            let check = validate_username(name);
            assert!(!check.is_valid, "{} should be reserved", name);
            assert!(check.error.as_deref().unwrap_or("").contains("reserved"));
        }
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("user@example.com", false).is_valid);
        assert!(validate_email("user.name+tag@sub.example.co", false).is_valid);
        assert!(!validate_email("", false).is_valid);
        assert!(!validate_email("no-at-sign", false).is_valid);
        assert!(!validate_email("nodomain@", false).is_valid);
        assert!(!validate_email("spaces in@example.com", false).is_valid);

        let long = format!("u@{}.com", "a".repeat(260));
        assert!(!validate_email(&long, false).is_valid);
    }

    #[test]
    fn email_typo_suggestions() {
        let check = validate_email("member@gmial.com", true);
        assert!(check.is_valid);
        assert_eq!(check.suggestion.as_deref(), Some("member@gmail.com"));

        // Suggestions only when asked for
        let check = validate_email("member@gmial.com", false);
        assert!(check.suggestion.is_none());

        // No suggestion for a correctly spelled domain
        let check = validate_email("member@gmail.com", true);
        assert!(check.suggestion.is_none());
    }

    #[test]
    fn sanitize_escapes_html() {
        assert_eq!(sanitize_input("<script>"), "&lt;script&gt;");
        assert_eq!(sanitize_input("a & b"), "a &amp; b");
        assert_eq!(sanitize_input(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(sanitize_input("it's"), "it&#x27;s");
        assert_eq!(sanitize_input("a=b"), "a&#x3D;b");
        assert_eq!(sanitize_input("path/x"), "path&#x2F;x");
        assert_eq!(sanitize_input("`tick`"), "&#x60;tick&#x60;");
        assert_eq!(sanitize_input(""), "");
        assert_eq!(sanitize_input("Mozilla (Windows NT)"), "Mozilla (Windows NT)");
    }

    #[test]
    fn generated_password_contains_all_classes() {
        for _ in 0..20 {
            let password = generate_secure_password(GENERATED_PASSWORD_LEN);
            assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
            assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.bytes().any(|b| SPECIAL.contains(&b)));
            assert!(validate_password_strength(&password).is_valid);
        }
    }

    #[test]
    fn generated_password_respects_minimum_length() {
        assert_eq!(generate_secure_password(4).len(), 8);
    }

    #[test]
    fn generated_passwords_differ() {
        assert_ne!(generate_secure_password(16), generate_secure_password(16));
    }
}

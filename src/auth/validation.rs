use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::{ResendRequest, SignupRequest, VerifyEmailRequest};
use crate::users::model::VwoLevel;

lazy_static! {
    // Dot-separated atoms on both sides; the top-level domain is at least two letters.
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[A-Za-z0-9_'+-]+(\.[A-Za-z0-9_'+-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
    )
    .unwrap();
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-ZÀ-ÿ\s'-]+$").unwrap();
}

const EMAIL_INVALID: &str = "Voer een geldig e-mailadres in";

/// Field-level messages in input order; joined for the response `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssues(pub Vec<String>);

impl ValidationIssues {
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub vwo_level: VwoLevel,
    pub subject: Option<String>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn check_email(email: &str, issues: &mut Vec<String>) {
    if !is_valid_email(email) {
        issues.push(EMAIL_INVALID.into());
    }
    if email.chars().count() > 254 {
        issues.push("E-mailadres is te lang".into());
    }
}

pub fn validate_signup(req: SignupRequest) -> Result<ValidSignup, ValidationIssues> {
    let mut issues = Vec::new();

    let name_len = req.name.chars().count();
    if name_len < 2 {
        issues.push("Naam moet minimaal 2 karakters bevatten".into());
    }
    if name_len > 50 {
        issues.push("Naam mag maximaal 50 karakters bevatten".into());
    }
    if !NAME_RE.is_match(&req.name) {
        issues.push("Naam mag alleen letters, spaties, apostroffen en koppeltekens bevatten".into());
    }

    let email = req.email.trim().to_lowercase();
    check_email(&email, &mut issues);

    let password = &req.password;
    if password.chars().count() < 8 {
        issues.push("Wachtwoord moet minimaal 8 karakters bevatten".into());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        issues.push("Wachtwoord moet minimaal één kleine letter bevatten".into());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push("Wachtwoord moet minimaal één hoofdletter bevatten".into());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push("Wachtwoord moet minimaal één cijfer bevatten".into());
    }

    let level = req.vwo_level.trim();
    let vwo_level = if level.is_empty() {
        issues.push("Selecteer je VWO niveau".into());
        None
    } else {
        match level.parse::<VwoLevel>() {
            Ok(level) => Some(level),
            Err(_) => {
                issues.push("Ongeldig VWO niveau".into());
                None
            }
        }
    };

    match vwo_level {
        Some(vwo_level) if issues.is_empty() => Ok(ValidSignup {
            name: req.name.trim().to_string(),
            email,
            password: req.password,
            vwo_level,
            subject: req
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }),
        _ => Err(ValidationIssues(issues)),
    }
}

pub fn validate_verify(req: VerifyEmailRequest) -> Result<String, ValidationIssues> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(ValidationIssues(vec!["Verificatietoken is verplicht".into()]));
    }
    Ok(token.to_string())
}

pub fn validate_resend(req: ResendRequest) -> Result<String, ValidationIssues> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ValidationIssues(vec![EMAIL_INVALID.into()]));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str, vwo: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            vwo_level: vwo.into(),
            subject: None,
        }
    }

    #[test]
    fn accepts_valid_signup_and_normalises() {
        let valid = validate_signup(signup(" Jan de Vries ", "Jan@Example.com", "TestPass123", "VWO 6"))
            .expect("valid");
        assert_eq!(valid.name, "Jan de Vries");
        assert_eq!(valid.email, "jan@example.com");
        assert_eq!(valid.vwo_level, VwoLevel::Vwo6);
        assert!(valid.subject.is_none());
    }

    #[test]
    fn accepts_accented_names_with_apostrophes() {
        assert!(validate_signup(signup("Zoë O'Brien-Müller", "z@x.nl", "TestPass123", "VWO 4")).is_ok());
    }

    #[test]
    fn collects_every_issue_in_field_order() {
        let issues = validate_signup(signup("J", "not-an-email", "short", "")).unwrap_err();
        assert_eq!(
            issues.0,
            vec![
                "Naam moet minimaal 2 karakters bevatten",
                "Voer een geldig e-mailadres in",
                "Wachtwoord moet minimaal 8 karakters bevatten",
                "Wachtwoord moet minimaal één hoofdletter bevatten",
                "Wachtwoord moet minimaal één cijfer bevatten",
                "Selecteer je VWO niveau",
            ]
        );
        assert!(issues.joined().contains(", "));
    }

    #[test]
    fn rejects_unknown_vwo_level_and_bad_name_characters() {
        let issues = validate_signup(signup("Jan<script>", "j@x.nl", "TestPass123", "VWO 3")).unwrap_err();
        assert_eq!(
            issues.0,
            vec![
                "Naam mag alleen letters, spaties, apostroffen en koppeltekens bevatten",
                "Ongeldig VWO niveau",
            ]
        );
    }

    #[test]
    fn email_shape_rejects_dot_runs_and_stray_punctuation() {
        for ok in ["jan@example.com", "jan.de.vries+exam@school.nl", "o'brien@mail.co.uk"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in [
            "a..b@x.nl",
            ".jan@x.nl",
            "jan.@x.nl",
            "a@b.c,",
            "a@b.c",
            "a@-b.nl",
            "a@b..nl",
            "jan@example",
            "jan example@x.nl",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn verify_requires_token() {
        let err = validate_verify(VerifyEmailRequest { token: "  ".into() }).unwrap_err();
        assert_eq!(err.0, vec!["Verificatietoken is verplicht"]);
    }

    #[test]
    fn resend_requires_valid_email() {
        assert!(validate_resend(ResendRequest { email: "nope".into() }).is_err());
        assert_eq!(
            validate_resend(ResendRequest { email: "Ghost@Example.com".into() }).unwrap(),
            "ghost@example.com"
        );
    }
}

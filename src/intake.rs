use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::lifecycle::{ApplicationStatus, PackageTier};
use crate::models::{AmbassadorApplication, ApplicationForm};

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ID_SUFFIX_LEN: usize = 9;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid email format")]
    InvalidEmail,

    #[error("unknown package `{0}`")]
    UnknownPackage(String),
}

/// Validates and normalises a submitted form into a fresh `pending` application.
pub fn build_application<R: Rng>(
    form: &ApplicationForm,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<AmbassadorApplication, IntakeError> {
    let missing = missing_fields(form);
    if !missing.is_empty() {
        return Err(IntakeError::MissingFields(missing));
    }

    let email = form.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(IntakeError::InvalidEmail);
    }

    let package_name = match form.package_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(
            PackageTier::parse(name).ok_or_else(|| IntakeError::UnknownPackage(name.to_string()))?,
        ),
        _ => None,
    };

    Ok(AmbassadorApplication {
        id: generate_id(now, rng),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        email,
        phone: form.phone.trim().to_string(),
        school: form.school.trim().to_string(),
        city: form.city.trim().to_string(),
        district: form.district.trim().to_string(),
        region: form.region.trim().to_string(),
        experience: form.experience.trim().to_string(),
        motivation: form.motivation.trim().to_string(),
        student_count: form.student_count.filter(|count| *count >= 0),
        status: ApplicationStatus::Pending,
        price: package_name.map(PackageTier::price).or(form.price),
        package_name,
        billing_info: None,
        notes: None,
        submitted_at: now,
        reviewed_at: None,
        reviewed_by: None,
        payment_declared_at: None,
    })
}

fn missing_fields(form: &ApplicationForm) -> Vec<&'static str> {
    [
        ("firstName", &form.first_name),
        ("lastName", &form.last_name),
        ("email", &form.email),
        ("phone", &form.phone),
        ("school", &form.school),
        ("city", &form.city),
        ("district", &form.district),
        ("motivation", &form.motivation),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect()
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// `ELCI-<unix millis>-<9 upper-case base36 chars>`.
pub fn generate_id<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("ELCI-{}-{}", now.timestamp_millis(), suffix)
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AmbassadorApplication, BillingInfo, Language};

pub const DEFAULT_REVIEWER: &str = "Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl PackageTier {
    pub const ALL: [PackageTier; 4] = [
        PackageTier::Bronze,
        PackageTier::Silver,
        PackageTier::Gold,
        PackageTier::Diamond,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PackageTier::Bronze => "Bronze",
            PackageTier::Silver => "Silver",
            PackageTier::Gold => "Gold",
            PackageTier::Diamond => "Diamond",
        }
    }

    /// Case-insensitive lookup by package name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(value))
    }

    /// Package fee in TL, paid by bank transfer.
    pub fn price(self) -> i32 {
        match self {
            PackageTier::Bronze => 250,
            PackageTier::Silver => 500,
            PackageTier::Gold => 950,
            PackageTier::Diamond => 1850,
        }
    }

    pub fn student_capacity(self) -> i32 {
        match self {
            PackageTier::Bronze => 50,
            PackageTier::Silver => 200,
            PackageTier::Gold => 500,
            PackageTier::Diamond => 1000,
        }
    }

    /// Referral share per recruited student, in USD.
    pub fn per_student_rate(self) -> i32 {
        match self {
            PackageTier::Bronze => 7,
            PackageTier::Silver => 6,
            PackageTier::Gold => 5,
            PackageTier::Diamond => 4,
        }
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of an application.
///
/// Persisted and exchanged as a plain string; the package-pending family is
/// encoded as `"<Package>-pending"` (for example `"Gold-pending"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    PackagePending(PackageTier),
    Active,
}

impl ApplicationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Rejected | ApplicationStatus::Active)
    }

    pub fn label(self, language: Language) -> String {
        match language {
            Language::Tr => match self {
                ApplicationStatus::Pending => "Beklemede".to_string(),
                ApplicationStatus::Approved => "Ön Onaylı".to_string(),
                ApplicationStatus::Rejected => "Reddedildi".to_string(),
                ApplicationStatus::PackagePending(tier) => format!("Onay Bekleniyor ({tier})"),
                ApplicationStatus::Active => "Aktif Üye".to_string(),
            },
            _ => match self {
                ApplicationStatus::Pending => "Pending".to_string(),
                ApplicationStatus::Approved => "Pre-approved".to_string(),
                ApplicationStatus::Rejected => "Rejected".to_string(),
                ApplicationStatus::PackagePending(tier) => {
                    format!("Awaiting payment confirmation ({tier})")
                }
                ApplicationStatus::Active => "Active member".to_string(),
            },
        }
    }

    pub fn badge(self) -> Badge {
        match self {
            ApplicationStatus::Pending => Badge::Secondary,
            ApplicationStatus::Approved | ApplicationStatus::Active => Badge::Success,
            ApplicationStatus::Rejected => Badge::Destructive,
            ApplicationStatus::PackagePending(_) => Badge::Default,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationStatus::Pending => f.write_str("pending"),
            ApplicationStatus::Approved => f.write_str("approved"),
            ApplicationStatus::Rejected => f.write_str("rejected"),
            ApplicationStatus::PackagePending(tier) => write!(f, "{tier}-pending"),
            ApplicationStatus::Active => f.write_str("active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown application status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => return Ok(ApplicationStatus::Pending),
            "approved" => return Ok(ApplicationStatus::Approved),
            "rejected" => return Ok(ApplicationStatus::Rejected),
            "active" => return Ok(ApplicationStatus::Active),
            _ => {}
        }

        let package = value
            .split_once('-')
            .filter(|(_, suffix)| *suffix == "pending")
            .map(|(package, _)| title_case(package))
            .and_then(|package| PackageTier::parse(&package));

        match package {
            Some(tier) => Ok(ApplicationStatus::PackagePending(tier)),
            None => Err(UnknownStatus(value.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.to_string()
    }
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Default,
    Secondary,
    Success,
    Destructive,
}

impl Badge {
    pub fn as_str(self) -> &'static str {
        match self {
            Badge::Default => "default",
            Badge::Secondary => "secondary",
            Badge::Success => "success",
            Badge::Destructive => "destructive",
        }
    }
}

/// Listing filter. Any value containing `-pending` selects the whole package-pending family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Exact(ApplicationStatus),
    AnyPackagePending,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Result<Self, UnknownStatus> {
        if value.contains("-pending") {
            return Ok(StatusFilter::AnyPackagePending);
        }
        value.parse().map(StatusFilter::Exact)
    }

    pub fn matches(self, status: ApplicationStatus) -> bool {
        match self {
            StatusFilter::Exact(expected) => expected == status,
            StatusFilter::AnyPackagePending => {
                matches!(status, ApplicationStatus::PackagePending(_))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Approve {
        reviewed_by: String,
        notes: Option<String>,
    },
    Reject {
        reviewed_by: String,
        notes: Option<String>,
    },
    DeclarePayment {
        package: PackageTier,
        billing: BillingInfo,
    },
    ConfirmPayment {
        reviewed_by: String,
    },
}

impl Transition {
    pub fn action(&self) -> &'static str {
        match self {
            Transition::Approve { .. } => "approve",
            Transition::Reject { .. } => "reject",
            Transition::DeclarePayment { .. } => "declare-payment",
            Transition::ConfirmPayment { .. } => "confirm-payment",
        }
    }

    fn accepts(&self, status: ApplicationStatus) -> bool {
        match self {
            Transition::Approve { .. } | Transition::Reject { .. } => {
                status == ApplicationStatus::Pending
            }
            Transition::DeclarePayment { .. } => status == ApplicationStatus::Approved,
            Transition::ConfirmPayment { .. } => {
                matches!(status, ApplicationStatus::PackagePending(_))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("application is {0} and can no longer change")]
    Terminal(ApplicationStatus),

    #[error("cannot {action} an application that is {from}")]
    InvalidTransition {
        from: ApplicationStatus,
        action: &'static str,
    },

    #[error("billing field `{0}` is required")]
    MissingBilling(&'static str),
}

/// Applies `transition` to `application`, returning the updated record.
///
/// The input is never mutated; callers persist the result only after the
/// store accepts it.
pub fn apply(
    application: &AmbassadorApplication,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<AmbassadorApplication, LifecycleError> {
    let current = application.status;
    if current.is_terminal() {
        return Err(LifecycleError::Terminal(current));
    }
    if !transition.accepts(current) {
        return Err(LifecycleError::InvalidTransition {
            from: current,
            action: transition.action(),
        });
    }

    let mut next = application.clone();
    match transition {
        Transition::Approve { reviewed_by, notes } | Transition::Reject { reviewed_by, notes } => {
            next.status = if matches!(transition, Transition::Approve { .. }) {
                ApplicationStatus::Approved
            } else {
                ApplicationStatus::Rejected
            };
            next.reviewed_by = Some(reviewer_or_default(reviewed_by));
            next.reviewed_at = Some(now);
            if let Some(notes) = notes {
                next.notes = Some(notes.clone());
            }
        }
        Transition::DeclarePayment { package, billing } => {
            if let Some(field) = billing.first_missing() {
                return Err(LifecycleError::MissingBilling(field));
            }
            next.status = ApplicationStatus::PackagePending(*package);
            next.package_name = Some(*package);
            next.price = Some(package.price());
            next.billing_info = Some(trimmed(billing));
            next.payment_declared_at = Some(now);
        }
        Transition::ConfirmPayment { reviewed_by } => {
            next.status = ApplicationStatus::Active;
            next.reviewed_by = Some(reviewer_or_default(reviewed_by));
            next.reviewed_at = Some(now);
        }
    }

    Ok(next)
}

fn reviewer_or_default(reviewer: &str) -> String {
    let reviewer = reviewer.trim();
    if reviewer.is_empty() {
        DEFAULT_REVIEWER.to_string()
    } else {
        reviewer.to_string()
    }
}

fn trimmed(billing: &BillingInfo) -> BillingInfo {
    BillingInfo {
        name: billing.name.trim().to_string(),
        address: billing.address.trim().to_string(),
        tax_office: billing.tax_office.trim().to_string(),
        tax_number: billing.tax_number.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
    }

    fn sample_application(status: ApplicationStatus) -> AmbassadorApplication {
        AmbassadorApplication {
            id: "ELCI-1772443800000-K3J9QW1ZP".to_string(),
            first_name: "Elif".to_string(),
            last_name: "Kaya".to_string(),
            email: "elif.kaya@example.com".to_string(),
            phone: "+90 532 000 00 00".to_string(),
            school: "Moda İlkokulu".to_string(),
            city: "İstanbul".to_string(),
            district: "Kadıköy".to_string(),
            region: String::new(),
            experience: String::new(),
            motivation: "Hareketli öğrenmeyi yaygınlaştırmak istiyorum.".to_string(),
            student_count: Some(120),
            status,
            package_name: None,
            price: None,
            billing_info: None,
            notes: None,
            submitted_at: submitted_at(),
            reviewed_at: None,
            reviewed_by: None,
            payment_declared_at: None,
        }
    }

    fn complete_billing() -> BillingInfo {
        BillingInfo {
            name: "Elif Kaya".to_string(),
            address: "Caferağa Mah. 5, Kadıköy".to_string(),
            tax_office: "Kadıköy".to_string(),
            tax_number: "12345678901".to_string(),
        }
    }

    fn approve() -> Transition {
        Transition::Approve {
            reviewed_by: "Admin".to_string(),
            notes: None,
        }
    }

    fn confirm() -> Transition {
        Transition::ConfirmPayment {
            reviewed_by: "Admin".to_string(),
        }
    }

    #[test]
    fn status_strings_cover_every_state() {
        let encoded = [
            "pending",
            "approved",
            "rejected",
            "Bronze-pending",
            "Silver-pending",
            "Gold-pending",
            "Diamond-pending",
            "active",
        ];
        for value in encoded {
            let status: ApplicationStatus = value.parse().unwrap();
            assert_eq!(status.to_string(), value);
        }

        assert!("archived".parse::<ApplicationStatus>().is_err());
        assert!("Platinum-pending".parse::<ApplicationStatus>().is_err());
        assert!("Gold-approved".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn package_pending_segment_is_title_cased() {
        let status: ApplicationStatus = "gold-pending".parse().unwrap();
        assert_eq!(status, ApplicationStatus::PackagePending(PackageTier::Gold));
        assert_eq!(status.to_string(), "Gold-pending");
    }

    #[test]
    fn labels_and_badges_follow_status() {
        let gold = ApplicationStatus::PackagePending(PackageTier::Gold);
        assert_eq!(gold.label(Language::Tr), "Onay Bekleniyor (Gold)");
        assert_eq!(ApplicationStatus::Approved.label(Language::Tr), "Ön Onaylı");
        assert_eq!(ApplicationStatus::Active.label(Language::En), "Active member");
        assert_eq!(ApplicationStatus::Pending.label(Language::De), "Pending");

        assert_eq!(gold.badge(), Badge::Default);
        assert_eq!(ApplicationStatus::Pending.badge().as_str(), "secondary");
        assert_eq!(ApplicationStatus::Rejected.badge().as_str(), "destructive");
        assert_eq!(ApplicationStatus::Active.badge().as_str(), "success");
    }

    #[test]
    fn status_filter_groups_package_pending_family() {
        let filter = StatusFilter::parse("Silver-pending").unwrap();
        assert!(filter.matches(ApplicationStatus::PackagePending(PackageTier::Gold)));
        assert!(!filter.matches(ApplicationStatus::Pending));

        let filter = StatusFilter::parse("approved").unwrap();
        assert!(filter.matches(ApplicationStatus::Approved));
        assert!(!filter.matches(ApplicationStatus::Active));

        assert!(StatusFilter::parse("whatever").is_err());
    }

    #[test]
    fn full_lifecycle_reaches_active() {
        let pending = sample_application(ApplicationStatus::Pending);
        let reviewed_at = submitted_at() + Duration::hours(4);

        let approved = apply(&pending, &approve(), reviewed_at).unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("Admin"));
        assert_eq!(approved.reviewed_at, Some(reviewed_at));

        let declared_at = reviewed_at + Duration::days(1);
        let declared = apply(
            &approved,
            &Transition::DeclarePayment {
                package: PackageTier::Gold,
                billing: complete_billing(),
            },
            declared_at,
        )
        .unwrap();
        assert_eq!(declared.status.to_string(), "Gold-pending");
        assert_eq!(declared.package_name, Some(PackageTier::Gold));
        assert_eq!(declared.price, Some(950));
        assert_eq!(declared.payment_declared_at, Some(declared_at));
        assert_eq!(declared.billing_info, Some(complete_billing()));

        let confirmed_at = declared_at + Duration::days(2);
        let active = apply(&declared, &confirm(), confirmed_at).unwrap();
        assert_eq!(active.status, ApplicationStatus::Active);
        assert_eq!(active.reviewed_at, Some(confirmed_at));
        assert_eq!(active.submitted_at, pending.submitted_at);
    }

    #[test]
    fn declaring_payment_requires_every_billing_field() {
        let approved = sample_application(ApplicationStatus::Approved);
        for field in ["name", "address", "taxOffice", "taxNumber"] {
            let mut billing = complete_billing();
            match field {
                "name" => billing.name.clear(),
                "address" => billing.address = "   ".to_string(),
                "taxOffice" => billing.tax_office.clear(),
                _ => billing.tax_number.clear(),
            }
            let result = apply(
                &approved,
                &Transition::DeclarePayment {
                    package: PackageTier::Bronze,
                    billing,
                },
                Utc::now(),
            );
            assert_eq!(result, Err(LifecycleError::MissingBilling(field)));
        }
    }

    #[test]
    fn terminal_states_refuse_every_transition() {
        let transitions = [
            approve(),
            Transition::Reject {
                reviewed_by: "Admin".to_string(),
                notes: None,
            },
            Transition::DeclarePayment {
                package: PackageTier::Silver,
                billing: complete_billing(),
            },
            confirm(),
        ];

        for status in [ApplicationStatus::Rejected, ApplicationStatus::Active] {
            let application = sample_application(status);
            for transition in &transitions {
                let result = apply(&application, transition, Utc::now());
                assert_eq!(result, Err(LifecycleError::Terminal(status)));
            }
            assert_eq!(application.status, status);
        }
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let pending = sample_application(ApplicationStatus::Pending);
        assert_eq!(
            apply(&pending, &confirm(), Utc::now()),
            Err(LifecycleError::InvalidTransition {
                from: ApplicationStatus::Pending,
                action: "confirm-payment",
            })
        );

        let approved = apply(&pending, &approve(), Utc::now()).unwrap();
        assert_eq!(
            apply(&approved, &approve(), Utc::now()),
            Err(LifecycleError::InvalidTransition {
                from: ApplicationStatus::Approved,
                action: "approve",
            })
        );
    }

    #[test]
    fn blank_reviewer_defaults_to_admin_and_keeps_notes() {
        let pending = sample_application(ApplicationStatus::Pending);
        let rejected = apply(
            &pending,
            &Transition::Reject {
                reviewed_by: " ".to_string(),
                notes: Some("Okul bilgisi doğrulanamadı".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(rejected.reviewed_by.as_deref(), Some(DEFAULT_REVIEWER));
        assert_eq!(rejected.notes.as_deref(), Some("Okul bilgisi doğrulanamadı"));
    }

    #[test]
    fn application_json_round_trip_keeps_lifecycle_fields() {
        let mut application = sample_application(ApplicationStatus::PackagePending(PackageTier::Diamond));
        application.package_name = Some(PackageTier::Diamond);
        application.billing_info = Some(complete_billing());

        let json = serde_json::to_value(&application).unwrap();
        assert_eq!(json["status"], "Diamond-pending");
        assert_eq!(json["packageName"], "Diamond");
        assert_eq!(json["billingInfo"]["taxOffice"], "Kadıköy");

        let decoded: AmbassadorApplication = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.status, application.status);
        assert_eq!(decoded.package_name, application.package_name);
        assert_eq!(decoded.billing_info, application.billing_info);
    }

    #[test]
    fn catalog_prices_match_tiers() {
        let prices: Vec<i32> = PackageTier::ALL.iter().map(|tier| tier.price()).collect();
        assert_eq!(prices, vec![250, 500, 950, 1850]);
        assert_eq!(PackageTier::parse("diamond"), Some(PackageTier::Diamond));
        assert_eq!(PackageTier::Silver.student_capacity(), 200);
        assert_eq!(PackageTier::Gold.per_student_rate(), 5);
        assert_eq!(PackageTier::parse("Platinum"), None);
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use super::profile::ProfilePatch;
use super::request::{Decision, RequestStatus};

/// Pending new-member application. Closed rows are retained to back the
/// signup history view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SignupRequest {
    pub id: Uuid,
    pub user_id: String,
    pub profile: Json<ProfilePatch>,
    pub status: RequestStatus,
    pub decision: Option<Decision>,
    pub denial_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field-level validation of a signup payload. The profile must carry
/// everything a new Business row needs.
pub fn validate_signup(profile: &ProfilePatch) -> Vec<String> {
    let mut errors = Vec::new();

    if is_blank(&profile.business_name) {
        errors.push("business name is required".into());
    }
    if is_blank(&profile.business_owner) {
        errors.push("business owner is required".into());
    }
    if is_blank(&profile.organization_type) {
        errors.push("organization type is required".into());
    }
    if is_blank(&profile.description) {
        errors.push("description is required".into());
    }

    if profile.organization_type.as_deref() == Some("Business") {
        if is_blank(&profile.business_type) {
            errors.push("business type is required for business organizations".into());
        }
        if is_blank(&profile.business_scale) {
            errors.push("business scale is required for business organizations".into());
        }
        if is_blank(&profile.number_of_employees) {
            errors.push("number of employees is required for business organizations".into());
        }
    }

    match &profile.physical_address {
        None => errors.push("physical address is required".into()),
        Some(addr) => validate_address(addr, "physical address", &mut errors),
    }
    match &profile.mailing_address {
        None => errors.push("mailing address is required".into()),
        Some(addr) => validate_address(addr, "mailing address", &mut errors),
    }

    match &profile.point_of_contact {
        None => errors.push("point of contact is required".into()),
        Some(contact) => {
            if is_blank(&contact.name) {
                errors.push("contact name is required".into());
            }
            match contact.email.as_deref().map(str::trim) {
                None | Some("") => errors.push("contact email is required".into()),
                Some(email) if !is_valid_email(email) => {
                    errors.push("contact email format is invalid".into());
                }
                _ => {}
            }
            match contact.phone_number.as_deref() {
                None | Some("") => errors.push("contact phone number is required".into()),
                Some(phone) => {
                    let digits = phone.chars().filter(char::is_ascii_digit).count();
                    if !(10..=11).contains(&digits) {
                        errors.push("contact phone number must have 10 or 11 digits".into());
                    }
                }
            }
        }
    }

    errors
}

fn validate_address(
    addr: &super::profile::AddressPatch,
    label: &str,
    errors: &mut Vec<String>,
) {
    if is_blank(&addr.street) {
        errors.push(format!("{label} street is required"));
    }
    if is_blank(&addr.city) {
        errors.push(format!("{label} city is required"));
    }
    if is_blank(&addr.state) {
        errors.push(format!("{label} state is required"));
    }
    match addr.zip.as_deref() {
        None | Some("") => errors.push(format!("{label} zip code is required")),
        Some(zip) if zip.len() != 5 || !zip.chars().all(|c| c.is_ascii_digit()) => {
            errors.push(format!("{label} zip code must be exactly 5 digits"));
        }
        _ => {}
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn is_valid_email(email: &str) -> bool {
    if email.contains("..")
        || email.starts_with('.')
        || email.ends_with('.')
        || email.contains("@.")
        || email.contains(".@")
    {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((_, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{AddressPatch, ContactPatch, ProfilePatch};

    fn complete_signup() -> ProfilePatch {
        ProfilePatch {
            business_name: Some("Casa Verde".into()),
            business_owner: Some("M. Rivera".into()),
            organization_type: Some("Business".into()),
            business_type: Some("Food".into()),
            business_scale: Some("Small Business".into()),
            number_of_employees: Some("1-10".into()),
            description: Some("Family restaurant".into()),
            physical_address: Some(AddressPatch {
                street: Some("123 Higuera St".into()),
                city: Some("San Luis Obispo".into()),
                state: Some("CA".into()),
                zip: Some("93401".into()),
            }),
            mailing_address: Some(AddressPatch {
                street: Some("PO Box 9".into()),
                city: Some("San Luis Obispo".into()),
                state: Some("CA".into()),
                zip: Some("93401".into()),
            }),
            point_of_contact: Some(ContactPatch {
                name: Some("M. Rivera".into()),
                phone_number: Some("805-555-0123".into()),
                email: Some("owner@casaverde.example.com".into()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn complete_payload_passes() {
        assert!(validate_signup(&complete_signup()).is_empty());
    }

    #[test]
    fn missing_name_and_bad_zip_are_reported() {
        let mut payload = complete_signup();
        payload.business_name = None;
        payload.physical_address.as_mut().unwrap().zip = Some("9340".into());

        let errors = validate_signup(&payload);
        assert!(errors.iter().any(|e| e.contains("business name")));
        assert!(errors.iter().any(|e| e.contains("exactly 5 digits")));
    }

    #[test]
    fn business_classification_required_only_for_business_orgs() {
        let mut payload = complete_signup();
        payload.organization_type = Some("Nonprofit".into());
        payload.business_type = None;
        payload.business_scale = None;
        payload.number_of_employees = None;

        assert!(validate_signup(&payload).is_empty());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["no-at-sign", "a..b@x.com", ".lead@x.com", "a@x", "a@.com"] {
            let mut payload = complete_signup();
            payload.point_of_contact.as_mut().unwrap().email = Some(bad.into());
            let errors = validate_signup(&payload);
            assert!(
                errors.iter().any(|e| e.contains("email")),
                "expected email error for {bad}"
            );
        }
    }
}

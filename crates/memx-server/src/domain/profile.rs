use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Street address as stored on businesses and the admin mailing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Designated contact person for a business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialHandles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
}

/// The canonical profile attributes shared by businesses, change-request
/// snapshots, and signup applications.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub business_name: String,
    pub business_owner: String,
    pub organization_type: String,
    pub business_type: Option<String>,
    pub business_scale: Option<String>,
    pub number_of_employees: Option<String>,
    pub gender: Option<String>,
    pub website: Option<String>,
    pub description: String,
    pub physical_address: Json<Address>,
    pub mailing_address: Json<Address>,
    pub point_of_contact: Json<Contact>,
    pub social_handles: Option<Json<SocialHandles>>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Partial profile: the wire format of change submissions and the stored
/// format of request `old`/`new` snapshots. Absent fields mean "not part of
/// this change".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_scale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_employees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_address: Option<AddressPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailing_address: Option<AddressPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_of_contact: Option<ContactPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_handles: Option<SocialHandles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
}

/// Image URLs displaced by an approval. The previous objects are deleted
/// from storage after the surrounding transaction commits.
#[derive(Debug, Default, PartialEq)]
pub struct ReplacedImages {
    pub logo: Option<String>,
    pub banner: Option<String>,
}

impl ReplacedImages {
    pub fn is_empty(&self) -> bool {
        self.logo.is_none() && self.banner.is_none()
    }
}

fn merge_field<T>(target: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *target = incoming;
    }
}

impl AddressPatch {
    fn merge(&mut self, incoming: AddressPatch) {
        merge_field(&mut self.street, incoming.street);
        merge_field(&mut self.city, incoming.city);
        merge_field(&mut self.state, incoming.state);
        merge_field(&mut self.zip, incoming.zip);
    }

    fn apply_to(&self, target: &mut Address) {
        if let Some(street) = &self.street {
            target.street = street.clone();
        }
        if let Some(city) = &self.city {
            target.city = city.clone();
        }
        if let Some(state) = &self.state {
            target.state = state.clone();
        }
        if let Some(zip) = &self.zip {
            target.zip = zip.clone();
        }
    }

    pub fn snapshot(addr: &Address) -> Self {
        Self {
            street: Some(addr.street.clone()),
            city: Some(addr.city.clone()),
            state: Some(addr.state.clone()),
            zip: Some(addr.zip.clone()),
        }
    }
}

impl ContactPatch {
    fn merge(&mut self, incoming: ContactPatch) {
        merge_field(&mut self.name, incoming.name);
        merge_field(&mut self.phone_number, incoming.phone_number);
        merge_field(&mut self.email, incoming.email);
    }

    fn apply_to(&self, target: &mut Contact) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(phone) = &self.phone_number {
            target.phone_number = phone.clone();
        }
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
    }

    pub fn snapshot(contact: &Contact) -> Self {
        Self {
            name: Some(contact.name.clone()),
            phone_number: Some(contact.phone_number.clone()),
            email: Some(contact.email.clone()),
        }
    }
}

impl ProfilePatch {
    /// Submit-merge policy: fold a newer submission into an existing open
    /// request. Provided fields overwrite, absent fields survive, nested
    /// objects merge field-by-field.
    pub fn merge(&mut self, incoming: ProfilePatch) {
        merge_field(&mut self.business_name, incoming.business_name);
        merge_field(&mut self.business_owner, incoming.business_owner);
        merge_field(&mut self.organization_type, incoming.organization_type);
        merge_field(&mut self.business_type, incoming.business_type);
        merge_field(&mut self.business_scale, incoming.business_scale);
        merge_field(&mut self.number_of_employees, incoming.number_of_employees);
        merge_field(&mut self.gender, incoming.gender);
        merge_field(&mut self.website, incoming.website);
        merge_field(&mut self.description, incoming.description);

        if let Some(incoming_addr) = incoming.physical_address {
            match &mut self.physical_address {
                Some(existing) => existing.merge(incoming_addr),
                empty => *empty = Some(incoming_addr),
            }
        }
        if let Some(incoming_addr) = incoming.mailing_address {
            match &mut self.mailing_address {
                Some(existing) => existing.merge(incoming_addr),
                empty => *empty = Some(incoming_addr),
            }
        }
        if let Some(incoming_contact) = incoming.point_of_contact {
            match &mut self.point_of_contact {
                Some(existing) => existing.merge(incoming_contact),
                empty => *empty = Some(incoming_contact),
            }
        }
        if let Some(incoming_social) = incoming.social_handles {
            let social = self.social_handles.get_or_insert_with(Default::default);
            merge_field(&mut social.instagram, incoming_social.instagram);
            merge_field(&mut social.twitter, incoming_social.twitter);
            merge_field(&mut social.facebook, incoming_social.facebook);
        }

        merge_field(&mut self.logo_url, incoming.logo_url);
        merge_field(&mut self.banner_url, incoming.banner_url);
    }

    /// Approval-merge policy: write a snapshot field onto the canonical
    /// profile only when the snapshot supplies a value and it differs from
    /// the current one. One-sided absence is no change. Returns the image
    /// URLs that were displaced by a different, non-default replacement.
    pub fn apply_to(&self, profile: &mut Profile) -> ReplacedImages {
        let mut replaced = ReplacedImages::default();

        if let Some(name) = &self.business_name {
            if *name != profile.business_name {
                profile.business_name = name.clone();
            }
        }
        if let Some(owner) = &self.business_owner {
            if *owner != profile.business_owner {
                profile.business_owner = owner.clone();
            }
        }
        if let Some(org) = &self.organization_type {
            if *org != profile.organization_type {
                profile.organization_type = org.clone();
            }
        }
        apply_optional(&mut profile.business_type, &self.business_type);
        apply_optional(&mut profile.business_scale, &self.business_scale);
        apply_optional(&mut profile.number_of_employees, &self.number_of_employees);
        apply_optional(&mut profile.gender, &self.gender);
        apply_optional(&mut profile.website, &self.website);
        if let Some(description) = &self.description {
            if *description != profile.description {
                profile.description = description.clone();
            }
        }

        if let Some(patch) = &self.physical_address {
            patch.apply_to(&mut profile.physical_address.0);
        }
        if let Some(patch) = &self.mailing_address {
            patch.apply_to(&mut profile.mailing_address.0);
        }
        if let Some(patch) = &self.point_of_contact {
            patch.apply_to(&mut profile.point_of_contact.0);
        }
        if let Some(incoming) = &self.social_handles {
            let current = profile
                .social_handles
                .get_or_insert_with(|| Json(SocialHandles::default()));
            if let Some(ig) = &incoming.instagram {
                current.0.instagram = Some(ig.clone());
            }
            if let Some(tw) = &incoming.twitter {
                current.0.twitter = Some(tw.clone());
            }
            if let Some(fb) = &incoming.facebook {
                current.0.facebook = Some(fb.clone());
            }
        }

        if let Some(new_logo) = &self.logo_url {
            if profile.logo_url.as_deref() != Some(new_logo.as_str()) {
                replaced.logo = profile.logo_url.replace(new_logo.clone());
            }
        }
        if let Some(new_banner) = &self.banner_url {
            if profile.banner_url.as_deref() != Some(new_banner.as_str()) {
                replaced.banner = profile.banner_url.replace(new_banner.clone());
            }
        }

        replaced
    }

    /// Full snapshot of a profile, used as the `old` side of a new request.
    pub fn snapshot(profile: &Profile) -> Self {
        Self {
            business_name: Some(profile.business_name.clone()),
            business_owner: Some(profile.business_owner.clone()),
            organization_type: Some(profile.organization_type.clone()),
            business_type: profile.business_type.clone(),
            business_scale: profile.business_scale.clone(),
            number_of_employees: profile.number_of_employees.clone(),
            gender: profile.gender.clone(),
            website: profile.website.clone(),
            description: Some(profile.description.clone()),
            physical_address: Some(AddressPatch::snapshot(&profile.physical_address.0)),
            mailing_address: Some(AddressPatch::snapshot(&profile.mailing_address.0)),
            point_of_contact: Some(ContactPatch::snapshot(&profile.point_of_contact.0)),
            social_handles: profile.social_handles.as_ref().map(|s| s.0.clone()),
            logo_url: profile.logo_url.clone(),
            banner_url: profile.banner_url.clone(),
        }
    }

    /// Email of the snapshot's point of contact, when one was supplied.
    pub fn contact_email(&self) -> Option<&str> {
        self.point_of_contact
            .as_ref()
            .and_then(|c| c.email.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        *self == ProfilePatch::default()
    }
}

fn apply_optional(target: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        if target.as_deref() != Some(value.as_str()) {
            *target = Some(value.clone());
        }
    }
}

use serde::{Deserialize, Serialize};

/// Column headers of the exported tables. Later stages look columns up by
/// these names, so they are part of the file format.
pub mod columns {
    pub const OFFER_TITLE: &str = "Titre Offre";
    pub const OFFER_COMPANY: &str = "Entreprise (mail)";
    pub const OFFER_LOCATION: &str = "Localisation";
    pub const OFFER_URL: &str = "URL Offre";
    pub const CONTACT: &str = "Contact Offre";
    pub const PHONE: &str = "Téléphone Offre";
    pub const SCRAPED_COMPANY: &str = "Entreprise (scrapée)";
    pub const COMPANY_LINKEDIN: &str = "LinkedIn Company URL";
    pub const PROFILE_LINKEDIN: &str = "LinkedIn Profile URL";
    pub const FE_FIRST_NAME: &str = "Prénom (FE)";
    pub const FE_LAST_NAME: &str = "Nom (FE)";
    pub const FE_HEADLINE: &str = "Titre (FE)";
    pub const FE_POSITION: &str = "Poste (FE)";
    pub const FE_COMPANY: &str = "Société (FE)";
    pub const FE_EMAIL: &str = "Email (FE)";
    pub const FE_PHONE: &str = "Téléphone (FE)";

    /// Every column in export order
    pub const ALL: [&str; 16] = [
        OFFER_TITLE,
        OFFER_COMPANY,
        OFFER_LOCATION,
        OFFER_URL,
        CONTACT,
        PHONE,
        SCRAPED_COMPANY,
        COMPANY_LINKEDIN,
        PROFILE_LINKEDIN,
        FE_FIRST_NAME,
        FE_LAST_NAME,
        FE_HEADLINE,
        FE_POSITION,
        FE_COMPANY,
        FE_EMAIL,
        FE_PHONE,
    ];
}

/// A job offer found in an alert email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    #[serde(rename = "Titre Offre")]
    pub title: String,

    #[serde(rename = "Entreprise (mail)")]
    pub company: String,

    #[serde(rename = "Localisation")]
    pub location: String,

    #[serde(rename = "URL Offre")]
    pub url: String,
}

/// Details scraped from the offer page itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

impl JobDetails {
    /// True when the page gave nothing usable
    pub fn is_empty(&self) -> bool {
        self.contact.is_none() && self.phone.is_none() && self.company.is_none()
    }
}

/// One line of the lead table. Each stage reads the previous export, fills
/// its own columns and writes the whole row back out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadRow {
    #[serde(rename = "Titre Offre")]
    pub title: String,

    #[serde(rename = "Entreprise (mail)")]
    pub mail_company: String,

    #[serde(rename = "Localisation")]
    pub location: String,

    #[serde(rename = "URL Offre")]
    pub offer_url: String,

    #[serde(rename = "Contact Offre")]
    pub contact: Option<String>,

    #[serde(rename = "Téléphone Offre")]
    pub phone: Option<String>,

    #[serde(rename = "Entreprise (scrapée)")]
    pub scraped_company: Option<String>,

    #[serde(rename = "LinkedIn Company URL")]
    pub company_linkedin: Option<String>,

    #[serde(rename = "LinkedIn Profile URL")]
    pub profile_linkedin: Option<String>,

    #[serde(rename = "Prénom (FE)")]
    pub first_name: Option<String>,

    #[serde(rename = "Nom (FE)")]
    pub last_name: Option<String>,

    #[serde(rename = "Titre (FE)")]
    pub headline: Option<String>,

    #[serde(rename = "Poste (FE)")]
    pub position: Option<String>,

    #[serde(rename = "Société (FE)")]
    pub enriched_company: Option<String>,

    #[serde(rename = "Email (FE)")]
    pub email: Option<String>,

    #[serde(rename = "Téléphone (FE)")]
    pub enriched_phone: Option<String>,
}

impl LeadRow {
    /// Build a row from a mail offer and what its page revealed
    pub fn from_offer(offer: OfferRecord, details: JobDetails) -> Self {
        let mut row = Self {
            title: offer.title,
            mail_company: offer.company,
            location: offer.location,
            offer_url: offer.url,
            ..Self::default()
        };
        row.set_details(details);
        row
    }

    pub fn set_details(&mut self, details: JobDetails) {
        self.contact = details.contact;
        self.phone = details.phone;
        self.scraped_company = details.company;
    }

    /// Company name usable as a search term, if the page gave one
    pub fn search_name(&self) -> Option<&str> {
        self.scraped_company
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

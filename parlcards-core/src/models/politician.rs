//! Politician records
//!
//! The list endpoint carries `current_party`/`current_riding`; the detail
//! endpoint carries `memberships` (newest first). Both normalize to
//! [`Politician`].

use super::{localized_en, string_or_empty};
use chrono::NaiveDate;
use parlcards_common::time::parse_date;
use serde::{Deserialize, Serialize};

const IMAGE_HOST: &str = "https://openparliament.ca";

/// Normalized politician record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Politician {
    pub slug: String,
    pub name: String,
    pub url: String,
    /// Party short name ("" when unaffiliated or unknown)
    pub party: String,
    pub party_slug: String,
    pub riding: String,
    pub province: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<Membership>,
}

/// One party/riding membership period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub party: String,
    pub riding: String,
    pub province: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPolitician {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub current_party: Option<RawParty>,
    #[serde(default)]
    pub current_riding: Option<RawRiding>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub memberships: Option<Vec<RawMembership>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawParty {
    #[serde(default, deserialize_with = "localized_en")]
    pub short_name: String,
    #[serde(default, deserialize_with = "localized_en")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRiding {
    #[serde(default, deserialize_with = "localized_en")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub province: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMembership {
    #[serde(default)]
    pub party: Option<RawParty>,
    #[serde(default)]
    pub riding: Option<RawRiding>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl RawParty {
    fn display_name(&self) -> &str {
        if self.short_name.is_empty() {
            &self.name
        } else {
            &self.short_name
        }
    }
}

impl Politician {
    /// Flatten a raw list or detail record
    pub fn from_raw(raw: RawPolitician) -> Self {
        let memberships = raw.memberships.unwrap_or_default();
        let latest = memberships.first();

        let party = match &raw.current_party {
            Some(party) => party.short_name.clone(),
            None => latest
                .and_then(|m| m.party.as_ref())
                .map(|p| p.display_name().to_string())
                .unwrap_or_default(),
        };

        let (mut riding, mut province) = raw
            .current_riding
            .as_ref()
            .map(|r| (r.name.clone(), r.province.clone()))
            .unwrap_or_default();
        if riding.is_empty() {
            if let Some(latest_riding) = latest.and_then(|m| m.riding.as_ref()) {
                riding = latest_riding.name.clone();
                if province.is_empty() {
                    province = latest_riding.province.clone();
                }
            }
        }

        let image = match raw.image {
            Some(image) if !image.is_empty() && !image.starts_with("http") => {
                format!("{}{}", IMAGE_HOST, image)
            }
            Some(image) => image,
            None => String::new(),
        };

        let memberships = memberships
            .iter()
            .map(|m| Membership {
                party: m
                    .party
                    .as_ref()
                    .map(|p| p.display_name().to_string())
                    .unwrap_or_default(),
                riding: m.riding.as_ref().map(|r| r.name.clone()).unwrap_or_default(),
                province: m
                    .riding
                    .as_ref()
                    .map(|r| r.province.clone())
                    .unwrap_or_default(),
                start_date: m.start_date.clone(),
                end_date: m.end_date.clone(),
            })
            .collect();

        Self {
            slug: slug_from_url(&raw.url),
            party_slug: party_slug(&party).to_string(),
            name: raw.name,
            url: raw.url,
            party,
            riding,
            province,
            image,
            memberships,
        }
    }
}

impl Politician {
    /// Start of the current uninterrupted run of memberships
    ///
    /// Back-to-back memberships (a party switch, a redrawn riding) extend the
    /// run. None when no membership carries a usable start date, which is
    /// always the case for list records.
    pub fn serving_since(&self) -> Option<NaiveDate> {
        let mut since = self
            .memberships
            .first()?
            .start_date
            .as_deref()
            .and_then(parse_date)?;
        for earlier in self.memberships.iter().skip(1) {
            let Some(end) = earlier.end_date.as_deref().and_then(parse_date) else {
                break;
            };
            if (since - end).num_days() > 1 {
                break;
            }
            match earlier.start_date.as_deref().and_then(parse_date) {
                Some(start) => since = start,
                None => break,
            }
        }
        Some(since)
    }
}

/// Last path segment of a resource URL: `/politicians/jane-doe/` -> `jane-doe`
pub fn slug_from_url(url: &str) -> String {
    url.trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Map a party name to a stable slug, `independent` when unrecognized
pub fn party_slug(party: &str) -> &'static str {
    const MAPPING: [(&str, &str); 10] = [
        ("liberal", "liberal"),
        ("lib.", "liberal"),
        ("conservative", "conservative"),
        ("cpc", "conservative"),
        ("ndp", "ndp"),
        ("new democratic", "ndp"),
        ("bloc", "bloc"),
        ("bq", "bloc"),
        ("green", "green"),
        ("gp", "green"),
    ];

    let lowered = party.to_lowercase();
    if lowered.is_empty() {
        return "independent";
    }
    MAPPING
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, slug)| *slug)
        .unwrap_or("independent")
}

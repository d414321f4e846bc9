//! One-tap directions links.

use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::identity::{Coordinates, CustomerIdentity};
use crate::query::UnknownVariant;

const FALLBACK_LABEL: &str = "Destination";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavPlatform {
    Android,
    Apple,
    #[default]
    Web,
}

impl FromStr for NavPlatform {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Self::Android),
            "apple" | "ios" => Ok(Self::Apple),
            "web" => Ok(Self::Web),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Build a directions link for `platform`.
///
/// Without coordinates the link searches for the label instead.
#[must_use]
pub fn navigation_url(platform: NavPlatform, coordinates: Option<Coordinates>, label: &str) -> String {
    let label = if label.trim().is_empty() {
        FALLBACK_LABEL
    } else {
        label.trim()
    };
    let label = utf8_percent_encode(label, NON_ALPHANUMERIC);

    match (platform, coordinates) {
        (NavPlatform::Android, Some(Coordinates { latitude, longitude })) => {
            format!("geo:{latitude},{longitude}?q={latitude},{longitude}({label})")
        }
        (NavPlatform::Android, None) => format!("geo:0,0?q={label}"),
        (NavPlatform::Apple, Some(Coordinates { latitude, longitude })) => {
            format!("https://maps.apple.com/?ll={latitude},{longitude}&q={label}")
        }
        (NavPlatform::Apple, None) => format!("https://maps.apple.com/?q={label}"),
        (NavPlatform::Web, Some(Coordinates { latitude, longitude })) => {
            format!("https://www.google.com/maps/search/?api=1&query={latitude},{longitude}")
        }
        (NavPlatform::Web, None) => {
            format!("https://www.google.com/maps/search/?api=1&query={label}")
        }
    }
}

/// Directions link for a reconciled customer.
#[must_use]
pub fn customer_navigation_url(platform: NavPlatform, identity: &CustomerIdentity) -> String {
    navigation_url(platform, identity.coordinates, &identity.display_name)
}

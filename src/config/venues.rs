//! Static per-venue platform profiles
//!
//! Each sports center runs its own copy of the same ASP.NET booking site. The
//! table below is the only place host names and page paths live.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::Error;

/// Captcha image endpoint, shared by every venue host
pub const CAPTCHA_URI: &str = "NewCaptcha.aspx";

/// Prefix of the persisted session key; the venue's upper-cased English name follows
pub const SESSION_KEY_PREFIX: &str = "ASP_SESSION_ID_";

/// Known venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueId {
    SanChong,
    JhongJheng,
    NanGang,
    TuCheng,
    ShiLin,
    DaTong,
    Banqiao,
    YongHe,
}

impl VenueId {
    /// Every venue, in table order
    pub const ALL: [VenueId; 8] = [
        Self::SanChong,
        Self::JhongJheng,
        Self::NanGang,
        Self::TuCheng,
        Self::ShiLin,
        Self::DaTong,
        Self::Banqiao,
        Self::YongHe,
    ];

    /// Static profile for this venue
    pub fn profile(self) -> &'static PlatformProfile {
        match self {
            Self::SanChong => &PROFILES[0],
            Self::JhongJheng => &PROFILES[1],
            Self::NanGang => &PROFILES[2],
            Self::TuCheng => &PROFILES[3],
            Self::ShiLin => &PROFILES[4],
            Self::DaTong => &PROFILES[5],
            Self::Banqiao => &PROFILES[6],
            Self::YongHe => &PROFILES[7],
        }
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.profile().name)
    }
}

impl FromStr for VenueId {
    type Err = Error;

    /// Accepts the Chinese name ("大同") or the English name in any case ("datong")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        VenueId::ALL
            .into_iter()
            .find(|id| {
                let profile = id.profile();
                profile.name == needle || profile.english_name.eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                let known: Vec<String> = VenueId::ALL
                    .iter()
                    .map(|id| format!("{} ({})", id.profile().name, id.profile().english_name))
                    .collect();
                Error::config(format!(
                    "Unknown venue '{needle}'. Known venues: {}",
                    known.join(", ")
                ))
            })
    }
}

/// Per-venue configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Venue identifier
    pub id: VenueId,
    /// Human name as shown on the site
    pub name: &'static str,
    /// Canonical English name, used for persisted keys
    pub english_name: &'static str,
    /// Scheme and host, no trailing slash
    pub host_url: &'static str,
    /// Venue page; login and booking are query variants of it
    pub place_uri: &'static str,
}

impl PlatformProfile {
    /// Key under which this venue's session token is persisted
    pub fn session_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.english_name.to_uppercase())
    }

    /// Reject profiles that cannot be used to build requests
    pub fn validate(&self) -> Result<(), Error> {
        if self.host_url.is_empty() || self.place_uri.is_empty() {
            return Err(Error::config(format!(
                "Venue {} ({}) has no host or page configured",
                self.name, self.english_name
            )));
        }

        Url::parse(self.host_url).map_err(|e| {
            Error::config(format!(
                "Venue {} has an invalid host '{}': {e}",
                self.name, self.host_url
            ))
        })?;

        Ok(())
    }
}

static PROFILES: [PlatformProfile; 8] = [
    PlatformProfile {
        id: VenueId::SanChong,
        name: "三重",
        english_name: "SanChong",
        host_url: "https://fe.xuanen.com.tw",
        place_uri: "fe01.aspx",
    },
    PlatformProfile {
        id: VenueId::JhongJheng,
        name: "中正",
        english_name: "JhongJheng",
        host_url: "https://www.cjcf.com.tw",
        place_uri: "jj01.aspx",
    },
    PlatformProfile {
        id: VenueId::NanGang,
        name: "南港",
        english_name: "NanGang",
        host_url: "https://scr.cyc.org.tw",
        place_uri: "tp02.aspx",
    },
    PlatformProfile {
        id: VenueId::TuCheng,
        name: "土城",
        english_name: "TuCheng",
        host_url: "https://scr.cyc.org.tw",
        place_uri: "tp08.aspx",
    },
    PlatformProfile {
        id: VenueId::ShiLin,
        name: "士林",
        english_name: "ShiLin",
        host_url: "https://www.ymca.com.tw",
        place_uri: "slsc68.aspx",
    },
    PlatformProfile {
        id: VenueId::DaTong,
        name: "大同",
        english_name: "DaTong",
        host_url: "https://bwd.xuanen.com.tw",
        place_uri: "wd02.aspx",
    },
    PlatformProfile {
        id: VenueId::Banqiao,
        name: "板橋",
        english_name: "Banqiao",
        host_url: "https://www.cjcf.com.tw",
        place_uri: "CG01.aspx",
    },
    PlatformProfile {
        id: VenueId::YongHe,
        name: "永和",
        english_name: "YongHe",
        host_url: "https://scr.cyc.org.tw",
        place_uri: "tp10.aspx",
    },
];

/// Validate the whole table; called once at startup
pub fn validate_all() -> Result<(), Error> {
    for id in VenueId::ALL {
        let profile = id.profile();
        if profile.id != id {
            return Err(Error::config(format!(
                "Venue table out of order: {id:?} resolves to {:?}",
                profile.id
            )));
        }
        profile.validate()?;
    }
    Ok(())
}

//! Named string formats
//!
//! Formats constrain a string field without changing its native kind: a
//! `string` field with the `email` format still deserialises to a string.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::primitives::hydrate_boolean;
use super::temporal::{parse_iso_date, parse_iso_datetime, parse_iso_duration, parse_iso_time};
use crate::schema::ValidationError;
use crate::value::Value;

/// String format tokens accepted by `string_format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    DateTime,
    Date,
    Time,
    Uri,
    Url,
    Email,
    Uuid,
    Hostname,
    Ipv4,
    Ipv6,
    Boolean,
    Semver,
    Byte,
    BsonObjectId,
    Base64url,
    Duration,
}

impl StringFormat {
    pub const ALL: [StringFormat; 16] = [
        StringFormat::DateTime,
        StringFormat::Date,
        StringFormat::Time,
        StringFormat::Uri,
        StringFormat::Url,
        StringFormat::Email,
        StringFormat::Uuid,
        StringFormat::Hostname,
        StringFormat::Ipv4,
        StringFormat::Ipv6,
        StringFormat::Boolean,
        StringFormat::Semver,
        StringFormat::Byte,
        StringFormat::BsonObjectId,
        StringFormat::Base64url,
        StringFormat::Duration,
    ];

    /// Wire token of this format
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Uri => "uri",
            StringFormat::Url => "url",
            StringFormat::Email => "email",
            StringFormat::Uuid => "uuid",
            StringFormat::Hostname => "hostname",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::Boolean => "boolean",
            StringFormat::Semver => "semver",
            StringFormat::Byte => "byte",
            StringFormat::BsonObjectId => "bson-object-id",
            StringFormat::Base64url => "base64url",
            StringFormat::Duration => "duration",
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StringFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StringFormat::ALL
            .iter()
            .copied()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| format!("unknown string format `{}`", s))
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$",
    )
    .expect("Invalid email regex")
});

static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$")
        .expect("Invalid hostname regex")
});

static SEMVER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(([0-9]+)\.([0-9]+)\.([0-9]+)(?:-([0-9a-z-]+(?:\.[0-9a-z-]+)*))?)(?:\+([0-9a-z-]+(?:\.[0-9a-z-]+)*))?$",
    )
    .expect("Invalid semver regex")
});

static URI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*:\S*$").expect("Invalid uri regex"));

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?|ftp)://(?:\S+(?::\S*)?@)?(?P<host>[^\s/:?#@]+)(?::\d{2,5})?(?:[/?#]\S*)?$")
        .expect("Invalid url regex")
});

static URL_HOST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9_\x{00a1}-\x{ffff}]+(?:-[a-z0-9_\x{00a1}-\x{ffff}]+)*(?:\.[a-z0-9_\x{00a1}-\x{ffff}]+(?:-[a-z0-9_\x{00a1}-\x{ffff}]+)*)*\.[a-z\x{00a1}-\x{ffff}]{2,}$",
    )
    .expect("Invalid url host regex")
});

static DOTTED_NUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+$").expect("Invalid regex"));

static OBJECT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("Invalid object id regex"));

fn format_error(format: StringFormat) -> ValidationError {
    ValidationError::format_error(format.as_str())
}

/// Rejects strings that are not plausible mailbox addresses, including any
/// address containing consecutive dots
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_REGEX.is_match(value) || value.contains("..") {
        return Err(format_error(StringFormat::Email));
    }
    Ok(())
}

pub fn validate_hostname(value: &str) -> Result<(), ValidationError> {
    if !HOSTNAME_REGEX.is_match(value) {
        return Err(format_error(StringFormat::Hostname));
    }
    Ok(())
}

pub fn validate_semver(value: &str) -> Result<(), ValidationError> {
    if !SEMVER_REGEX.is_match(value) {
        return Err(format_error(StringFormat::Semver));
    }
    Ok(())
}

pub fn validate_uri(value: &str) -> Result<(), ValidationError> {
    if !URI_REGEX.is_match(value) {
        return Err(format_error(StringFormat::Uri));
    }
    Ok(())
}

/// Accepts http, https and ftp URLs pointing at public hosts.
///
/// Hosts must be a dotted domain with an alphabetic top-level label or a
/// public unicast IPv4 address; private, loopback and link-local ranges are
/// rejected.
pub fn validate_url(value: &str) -> Result<(), ValidationError> {
    let invalid = || format_error(StringFormat::Url);
    let captures = URL_REGEX.captures(value).ok_or_else(invalid)?;
    let host = captures.name("host").map(|m| m.as_str()).ok_or_else(invalid)?;

    if DOTTED_NUMERIC_REGEX.is_match(host) {
        let addr: Ipv4Addr = host.parse().map_err(|_| invalid())?;
        return if is_public_ipv4(addr) {
            Ok(())
        } else {
            Err(invalid())
        };
    }

    if URL_HOST_REGEX.is_match(host) {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn is_public_ipv4(addr: Ipv4Addr) -> bool {
    let [first, second, _, last] = addr.octets();
    let reserved = first == 10
        || first == 127
        || (first == 169 && second == 254)
        || (first == 192 && second == 168)
        || (first == 172 && (16..=31).contains(&second));
    !reserved && (1..=223).contains(&first) && (1..=254).contains(&last)
}

/// Standard base64 text
pub fn validate_byte(value: &str) -> Result<(), ValidationError> {
    STANDARD
        .decode(value)
        .map(|_| ())
        .map_err(|_| format_error(StringFormat::Byte))
}

/// URL-safe base64 text, padded or not
pub fn validate_base64url(value: &str) -> Result<(), ValidationError> {
    URL_SAFE
        .decode(value)
        .or_else(|_| URL_SAFE_NO_PAD.decode(value))
        .map(|_| ())
        .map_err(|_| format_error(StringFormat::Base64url))
}

/// 24 hexadecimal digits
pub fn validate_object_id(value: &str) -> Result<(), ValidationError> {
    if !OBJECT_ID_REGEX.is_match(value) {
        return Err(format_error(StringFormat::BsonObjectId));
    }
    Ok(())
}

/// Validates `value` against a named format
pub fn validate_format(value: &str, format: StringFormat) -> Result<(), ValidationError> {
    let outcome = match format {
        StringFormat::DateTime => parse_iso_datetime(value).map(|_| ()),
        StringFormat::Date => parse_iso_date(value).map(|_| ()),
        StringFormat::Time => parse_iso_time(value).map(|_| ()),
        StringFormat::Duration => parse_iso_duration(value).map(|_| ()),
        StringFormat::Uri => validate_uri(value),
        StringFormat::Url => validate_url(value),
        StringFormat::Email => validate_email(value),
        StringFormat::Uuid => Uuid::parse_str(value).map(|_| ()).map_err(|_| format_error(format)),
        StringFormat::Hostname => validate_hostname(value),
        StringFormat::Ipv4 => value
            .parse::<std::net::Ipv4Addr>()
            .map(|_| ())
            .map_err(|_| format_error(format)),
        StringFormat::Ipv6 => value
            .parse::<std::net::Ipv6Addr>()
            .map(|_| ())
            .map_err(|_| format_error(format)),
        StringFormat::Boolean => hydrate_boolean(&Value::from(value)).map(|_| ()),
        StringFormat::Semver => validate_semver(value),
        StringFormat::Byte => validate_byte(value),
        StringFormat::BsonObjectId => validate_object_id(value),
        StringFormat::Base64url => validate_base64url(value),
    };

    // Parsers report their own type errors; a format failure is always a
    // format error naming the token.
    outcome.map_err(|_| format_error(format))
}

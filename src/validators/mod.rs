//! Primitive and format validators
//!
//! Stateless functions used by codecs to check and coerce scalars. They are
//! public so hosts can reuse them for ad-hoc checks outside a schema.

mod formats;
mod primitives;
pub mod temporal;

pub use formats::{
    validate_base64url, validate_byte, validate_email, validate_format, validate_hostname,
    validate_object_id, validate_semver, validate_uri, validate_url, StringFormat,
};
pub use primitives::{
    hydrate_boolean, validate_boolean, validate_bytes, validate_date, validate_datetime,
    validate_decimal, validate_duration, validate_float, validate_integer, validate_ipv4,
    validate_ipv6, validate_length, validate_multiple_of, validate_pattern, validate_range,
    validate_string, validate_time, validate_uuid, Bounded, Divisible,
};
pub use temporal::{
    format_iso_date, format_iso_datetime, format_iso_duration, format_iso_time, parse_iso_date,
    parse_iso_datetime, parse_iso_duration, parse_iso_time,
};

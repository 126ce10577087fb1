//! HTTP-date parsing and formatting (`Date`, `Expires`, `Last-Modified`, `Retry-After`).

// crates.io
use time::{
	PrimitiveDateTime,
	format_description::{BorrowedFormatItem, well_known::Rfc2822},
	macros::format_description,
};
// self
use crate::_prelude::*;

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
	"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Parses an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`), falling back to RFC 2822.
pub fn parse_http_date(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	PrimitiveDateTime::parse(raw, IMF_FIXDATE)
		.map(PrimitiveDateTime::assume_utc)
		.or_else(|_| OffsetDateTime::parse(raw, &Rfc2822))
		.ok()
}

/// Formats an instant as an IMF-fixdate in UTC.
pub fn format_http_date(instant: OffsetDateTime) -> Option<String> {
	let utc = instant.to_offset(time::UtcOffset::UTC);

	PrimitiveDateTime::new(utc.date(), utc.time()).format(IMF_FIXDATE).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn imf_fixdate_round_trips() {
		let instant = macros::datetime!(1994-11-06 08:49:37 UTC);
		let formatted = format_http_date(instant).expect("Instant should format.");

		assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
		assert_eq!(parse_http_date(&formatted), Some(instant));
	}

	#[test]
	fn rfc2822_offsets_are_accepted() {
		let parsed = parse_http_date("Sun, 06 Nov 1994 09:49:37 +0100");

		assert_eq!(parsed, Some(macros::datetime!(1994-11-06 08:49:37 UTC)));
	}

	#[test]
	fn garbage_is_rejected() {
		assert_eq!(parse_http_date("not a date"), None);
	}
}

use regex::Regex;

/// Last standalone five-digit group in a free-form address string. US-style
/// addresses put the ZIP last, so later matches win over street numbers.
pub fn postal_code(text: &str) -> Option<String> {
	let re = Regex::new(r"\b(\d{5})\b").ok()?;

	re.find_iter(text).last().map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn picks_last_five_digit_group() {
		assert_eq!(
			postal_code("12345 Elm St, San Jose, CA 95123"),
			Some("95123".to_string()),
		);
	}

	#[test]
	fn ignores_longer_digit_runs() {
		assert_eq!(postal_code("unit 123456"), None);
		assert_eq!(postal_code("no digits here"), None);
	}
}

//! Business-unit (UNE) codes used to scope analytics queries.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const UNE_MAX_LEN: usize = 32;

/// Error returned when a UNE code fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum UneCodeError {
	/// The code was empty.
	#[error("UNE code cannot be empty.")]
	Empty,
	/// The code contains characters other than ASCII letters, digits, `-`, or `_`.
	#[error("UNE code `{code}` contains unsupported characters.")]
	InvalidCharacter {
		/// Offending code.
		code: String,
	},
	/// The code exceeded the allowed character count.
	#[error("UNE code exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Retail business-unit (store) identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UneCode(String);
impl UneCode {
	/// Creates a new code after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, UneCodeError> {
		let view = value.as_ref();

		validate(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for UneCode {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for UneCode {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<UneCode> for String {
	fn from(value: UneCode) -> Self {
		value.0
	}
}
impl TryFrom<String> for UneCode {
	type Error = UneCodeError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl Debug for UneCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Une({})", self.0)
	}
}
impl Display for UneCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for UneCode {
	type Err = UneCodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate(view: &str) -> Result<(), UneCodeError> {
	if view.is_empty() {
		return Err(UneCodeError::Empty);
	}
	if !view.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) {
		return Err(UneCodeError::InvalidCharacter { code: view.into() });
	}
	if view.len() > UNE_MAX_LEN {
		return Err(UneCodeError::TooLong { max: UNE_MAX_LEN });
	}

	Ok(())
}

//! Typed builder for request paths below a [`Resource`] root.

// self
use crate::{_prelude::*, api::Resource};

/// Error returned when a path segment would escape or corrupt the route.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PathError {
	/// Empty segments would collapse into `//`.
	#[error("Path segments cannot be empty.")]
	Empty,
	/// The segment contains a separator, whitespace, or query delimiter.
	#[error("Path segment `{segment}` contains a reserved character.")]
	ReservedCharacter {
		/// Offending segment.
		segment: String,
	},
	/// `.` and `..` would change the target resource.
	#[error("Path segment `{segment}` is a relative reference.")]
	DotSegment {
		/// Offending segment.
		segment: String,
	},
}

/// Relative API path such as `/admin/users/42`, resolved against the API prefix on send.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiPath {
	resource: Resource,
	segments: Vec<String>,
}
impl ApiPath {
	/// Starts a path at the resource root.
	pub fn new(resource: Resource) -> Self {
		Self { resource, segments: Vec::new() }
	}

	/// Appends one validated segment.
	pub fn segment(mut self, segment: impl Display) -> Result<Self, PathError> {
		let segment = segment.to_string();

		validate_segment(&segment)?;
		self.segments.push(segment);

		Ok(self)
	}

	/// Resource root of the path.
	pub fn resource(&self) -> Resource {
		self.resource
	}
}
impl Display for ApiPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "/{}", self.resource)?;

		for segment in &self.segments {
			write!(f, "/{segment}")?;
		}

		Ok(())
	}
}
impl From<Resource> for ApiPath {
	fn from(resource: Resource) -> Self {
		Self::new(resource)
	}
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
	if segment.is_empty() {
		return Err(PathError::Empty);
	}
	if segment == "." || segment == ".." {
		return Err(PathError::DotSegment { segment: segment.into() });
	}
	if segment.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '%')) {
		return Err(PathError::ReservedCharacter { segment: segment.into() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn segments_render_below_resource() {
		let path = ApiPath::new(Resource::Admin)
			.segment("users")
			.and_then(|path| path.segment(42))
			.expect("Valid segments should be accepted.");

		assert_eq!(path.to_string(), "/admin/users/42");
		assert_eq!(ApiPath::from(Resource::Rupturas).to_string(), "/rupturas");
	}

	#[test]
	fn unsafe_segments_are_rejected() {
		let root = ApiPath::new(Resource::Reports);

		assert_eq!(root.clone().segment(""), Err(PathError::Empty));
		assert!(matches!(root.clone().segment(".."), Err(PathError::DotSegment { .. })));
		assert!(matches!(
			root.clone().segment("a/b"),
			Err(PathError::ReservedCharacter { .. })
		));
		assert!(matches!(root.segment("x?y=1"), Err(PathError::ReservedCharacter { .. })));
	}
}

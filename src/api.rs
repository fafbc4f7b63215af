//! Backend route catalog: resource roots, typed path building, and retail identifiers.

pub mod path;
pub mod une;

pub use path::*;
pub use une::*;

// self
use crate::_prelude::*;

/// Login endpoint, relative to the API prefix.
pub const AUTH_LOGIN: &str = "/auth/login";
/// Refresh endpoint, relative to the API prefix.
pub const AUTH_REFRESH: &str = "/auth/refresh";
/// Current-user endpoint, relative to the API prefix.
pub const AUTH_ME: &str = "/auth/me";

/// Top-level resource groups exposed by the dashboard backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	/// Login, refresh, and current-user endpoints.
	Auth,
	/// Sales and inventory aggregations.
	Analytics,
	/// User administration.
	Admin,
	/// Saved and generated reports.
	Reports,
	/// Stockout diagnostics.
	Rupturas,
	/// Stock transfers between units.
	Transfers,
	/// Data-sync and health diagnostics.
	Diagnostics,
}
impl Resource {
	/// Returns the path segment for the resource.
	pub const fn as_str(self) -> &'static str {
		match self {
			Resource::Auth => "auth",
			Resource::Analytics => "analytics",
			Resource::Admin => "admin",
			Resource::Reports => "reports",
			Resource::Rupturas => "rupturas",
			Resource::Transfers => "transfers",
			Resource::Diagnostics => "diagnostics",
		}
	}
}
impl Display for Resource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

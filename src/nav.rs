//! Navigation hooks invoked when a session ends.

// self
use crate::_prelude::*;

type NavigateCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Host-application hook that knows where the user is and can send them elsewhere.
///
/// In the dashboard this is the browser location; headless hosts (CLIs, report jobs) can use
/// [`NoopNavigator`] or react to forced logouts through [`TrackedNavigator::with_callback`].
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Current route, e.g. `/dashboard?une=017`.
	fn current_path(&self) -> String;

	/// Moves the host to `path`.
	fn navigate(&self, path: &str);
}

/// Navigator for hosts without routes; navigation requests are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn current_path(&self) -> String {
		String::new()
	}

	fn navigate(&self, _path: &str) {}
}

/// In-process navigator that tracks the current route and every navigation.
#[derive(Default)]
pub struct TrackedNavigator {
	current: Mutex<String>,
	history: Mutex<Vec<String>>,
	callback: Option<NavigateCallback>,
}
impl TrackedNavigator {
	/// Creates a navigator positioned at `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self { current: Mutex::new(initial.into()), history: Default::default(), callback: None }
	}

	/// Runs `callback` after every navigation.
	pub fn with_callback<F>(mut self, callback: F) -> Self
	where
		F: 'static + Fn(&str) + Send + Sync,
	{
		self.callback = Some(Box::new(callback));

		self
	}

	/// Routes navigated to so far, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.history.lock().clone()
	}
}
impl Navigator for TrackedNavigator {
	fn current_path(&self) -> String {
		self.current.lock().clone()
	}

	fn navigate(&self, path: &str) {
		*self.current.lock() = path.to_owned();
		self.history.lock().push(path.to_owned());

		if let Some(callback) = &self.callback {
			callback(path);
		}
	}
}
impl Debug for TrackedNavigator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TrackedNavigator")
			.field("current", &*self.current.lock())
			.field("history_len", &self.history.lock().len())
			.field("callback_set", &self.callback.is_some())
			.finish()
	}
}

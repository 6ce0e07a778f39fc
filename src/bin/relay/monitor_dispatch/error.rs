#[derive(Debug)]
pub enum Error {
	NoDispatchRunning,
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NoDispatchRunning => write!(f, "no monitor dispatch is running"),
		}
	}
}

impl std::error::Error for Error {}

// A bunch of stuff used to determine if the relay should serve in secure mode or not

use std::env;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

const SSL_MODE_ENV_KEY: &str = "SSL_MODE";
const SSL_CERT_PATH_ENV_KEY: &str = "SSL_CERT_PATH";
const SSL_KEY_PATH_ENV_KEY: &str = "SSL_KEY_PATH";

pub struct SslModeSettings {
	pub cert_path: String,
	pub key_path: String,
}

pub fn get_ssl_mode_settings() -> Result<Option<SslModeSettings>, Error> {
	let secure_mode = match env::var(SSL_MODE_ENV_KEY) {
		Ok(val) => val
			.parse::<i32>()
			.map_err(|e| format!("Error parsing {SSL_MODE_ENV_KEY} value: {e}"))?
			> 0,
		Err(_) => {
			log::info!("{SSL_MODE_ENV_KEY} was not found. Running in non-secure mode.");
			log::info!("The environment variable {SSL_MODE_ENV_KEY}=1 is required on an environment using HTTPS");
			false
		}
	};

	if !secure_mode {
		return Ok(None);
	}

	let cert_path = env::var(SSL_CERT_PATH_ENV_KEY).map_err(|_| {
		format!("The {SSL_CERT_PATH_ENV_KEY} environment variable is required when {SSL_MODE_ENV_KEY}=1")
	})?;

	let key_path = env::var(SSL_KEY_PATH_ENV_KEY).map_err(|_| {
		format!("The {SSL_KEY_PATH_ENV_KEY} environment variable is required when {SSL_MODE_ENV_KEY}=1")
	})?;

	Ok(Some(SslModeSettings { cert_path, key_path }))
}

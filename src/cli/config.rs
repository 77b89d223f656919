use secrecy::SecretString;

/// Runtime configuration, built once at startup from CLI/env arguments and
/// passed by reference to the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub frontend_url: String,
    pub debug: bool,
}

impl Config {
    #[must_use]
    pub fn new(port: u16, dsn: String, jwt_secret: SecretString, frontend_url: String) -> Self {
        Self {
            port,
            dsn,
            jwt_secret,
            frontend_url,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_config() {
        let config = Config::new(
            8080,
            "postgres://localhost:5432/gatepass".to_string(),
            SecretString::from("super-secret".to_string()),
            "http://localhost:3000".to_string(),
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.dsn, "postgres://localhost:5432/gatepass");
        assert_eq!(config.jwt_secret.expose_secret(), "super-secret");
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert!(!config.debug);
    }

    #[test]
    fn test_config_with_debug() {
        let config = Config::new(
            8080,
            "postgres://localhost:5432/gatepass".to_string(),
            SecretString::from("super-secret".to_string()),
            "http://localhost:3000".to_string(),
        )
        .with_debug(true);
        assert!(config.debug);
    }

    #[test]
    fn test_config_debug_output_redacts_secret() {
        let config = Config::new(
            8080,
            "postgres://localhost:5432/gatepass".to_string(),
            SecretString::from("super-secret".to_string()),
            "http://localhost:3000".to_string(),
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}

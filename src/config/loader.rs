//! Configuration loading from disk and the command line.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{ProxyConfig, ResponseBodyPolicy, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Diagnostic reverse proxy that mirrors traffic to stdout.
#[derive(Debug, Parser)]
#[command(name = "mirror-proxy", version)]
pub struct Cli {
    /// Listen address.
    #[arg(short = 'l', long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,

    /// Forward address (host:port).
    #[arg(short = 'f', long = "forward", value_name = "HOST:PORT")]
    pub forward: Option<String>,

    /// TLS certificate (PEM). Requires --key.
    ///
    /// Replaces the single-dash `-cert` flag; clap short flags are one character.
    #[arg(short = 'c', long = "cert", value_name = "PATH", requires = "key")]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM). Requires --cert.
    ///
    /// Replaces the single-dash `-key` flag.
    #[arg(short = 'k', long = "key", value_name = "PATH", requires = "cert")]
    pub key: Option<PathBuf>,

    /// Scheme used to reach the upstream.
    #[arg(long)]
    pub scheme: Option<String>,

    /// Mirror request bodies as they are forwarded.
    #[arg(long)]
    pub mirror_request_body: bool,

    /// Which response bodies to mirror.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub response_body: Option<ResponseBodyPolicy>,

    /// Append the transcript to a file instead of stdout.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Prometheus exporter address.
    #[arg(long, value_name = "ADDR")]
    pub metrics: Option<String>,

    /// TOML configuration file. Flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags.
    pub fn resolve(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => ProxyConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(forward) = &self.forward {
            config.upstream.address = forward.clone();
        }
        if let (Some(cert), Some(key)) = (&self.cert, &self.key) {
            config.listener.tls = Some(TlsConfig {
                cert_path: cert.display().to_string(),
                key_path: key.display().to_string(),
            });
        }
        if let Some(scheme) = &self.scheme {
            config.upstream.scheme = scheme.clone();
        }
        if self.mirror_request_body {
            config.mirror.request_body = true;
        }
        if let Some(policy) = self.response_body {
            config.mirror.response_body = policy;
        }
        if let Some(output) = &self.output {
            config.mirror.output = Some(output.display().to_string());
        }
        if let Some(metrics) = &self.metrics {
            config.observability.metrics_address = Some(metrics.clone());
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mirror-proxy").chain(args.iter().copied()))
    }

    #[test]
    fn no_flags_means_defaults() {
        let config = parse(&[]).unwrap().resolve().unwrap();
        assert_eq!(config, ProxyConfig::default());
    }

    #[test]
    fn short_flags() {
        let cli = parse(&["-l", "127.0.0.1:8100", "-f", "backend:9100"]).unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8100");
        assert_eq!(config.upstream.address, "backend:9100");
        assert!(config.listener.tls.is_none());
    }

    #[test]
    fn listen_on_port_only() {
        let config = parse(&["-l", ":9090"]).unwrap().resolve().unwrap();
        assert_eq!(config.listener.bind_address, ":9090");
        assert_eq!(config.listener.bind_target(), "0.0.0.0:9090");
    }

    #[test]
    fn listen_on_hostname() {
        let config = parse(&["-l", "localhost:8000"]).unwrap().resolve().unwrap();
        assert_eq!(config.listener.bind_target(), "localhost:8000");
    }

    #[test]
    fn cert_without_key_is_rejected() {
        assert!(parse(&["--cert", "cert.pem"]).is_err());
        assert!(parse(&["-k", "key.pem"]).is_err());
    }

    #[test]
    fn help_names_renamed_tls_flags() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("-c, --cert"));
        assert!(help.contains("-k, --key"));
        assert_eq!(help.matches("Replaces the single-dash").count(), 2);
    }

    #[test]
    fn policy_flags() {
        let cli = parse(&["--mirror-request-body", "--response-body", "always"]).unwrap();
        let config = cli.resolve().unwrap();
        assert!(config.mirror.request_body);
        assert_eq!(config.mirror.response_body, ResponseBodyPolicy::Always);
    }

    #[test]
    fn invalid_forward_address_fails_validation() {
        let err = parse(&["-f", "::not an address::"]).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn flags_override_file() {
        let path = std::env::temp_dir().join(format!("mirror-proxy-config-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[listener]\nbind_address = \"127.0.0.1:7000\"\n\n[upstream]\naddress = \"file-host:1\"\n",
        )
        .unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "-f", "flag-host:2"]).unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");
        assert_eq!(config.upstream.address, "flag-host:2");

        assert_eq!(load_config(&path).unwrap().upstream.address, "file-host:1");
        let _ = fs::remove_file(&path);
    }
}

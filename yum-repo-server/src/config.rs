//! # Configuration Management
//!
//! The configuration is read once at startup and never changes afterwards. It is
//! assembled from three layers, later layers winning:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. a YAML file, either given explicitly or discovered as `.yummy.yaml` in the
//!    home directory or next to the executable
//! 3. `YUMMY_*` environment variables ([`Config::apply_env`])
//!
//! The file nests everything below a `yum` key:
//!
//! ```yaml
//! yum:
//!   repoPath: /srv/yum
//!   createrepoBinary: /usr/bin/createrepo
//!   rpmBinary: /usr/bin/rpm
//!   helpFile: /etc/yummy/help.md
//!   workers: 2
//!   protected: true
//!   port: 8080
//!   auth:
//!     enabled: true
//!     user: uploader
//!     password: secret
//! ```
//!
//! [`Config::validate`] performs the startup checks. Any failure there is fatal:
//! the server refuses to start instead of failing at request time.

use anyhow::{bail, Context, Result};
use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the configuration file searched for when no `--config` is given.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".yummy.yaml";

/// Runtime configuration of the repository server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directory holding the package files and the generated `repodata/`
    #[serde(alias = "repopath")]
    pub repo_path: PathBuf,
    /// Metadata generation tool, absolute path or a command name found in `PATH`
    pub createrepo_binary: PathBuf,
    /// Package tool, checked at startup only
    pub rpm_binary: PathBuf,
    /// Markdown document rendered at `/help`
    pub help_file: PathBuf,
    /// Worker count handed to the metadata tool
    pub workers: u32,
    /// Refuse to overwrite packages that already exist
    pub protected: bool,
    /// Address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Largest accepted request body in megabytes
    pub max_upload_size_mb: usize,
    /// Credentials for the access guard
    pub auth: AuthConfig,
}

/// Basic-auth settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// When disabled the access guard lets every request through
    pub enabled: bool,
    pub user: String,
    pub password: String,
    /// Also require credentials for uploads, not only for deletes
    pub protect_upload: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repo_path: PathBuf::from("./repo"),
            createrepo_binary: PathBuf::from("createrepo"),
            rpm_binary: PathBuf::from("rpm"),
            help_file: PathBuf::from("./help.md"),
            workers: 2,
            protected: false,
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size_mb: 512,
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    yum: Config,
}

impl Config {
    /// Parse configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile =
            serde_yaml_ng::from_str(text).context("Failed to parse configuration YAML")?;
        Ok(file.yum)
    }

    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    /// Locations searched for `.yummy.yaml`, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(DEFAULT_CONFIG_FILE_NAME));
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.join(DEFAULT_CONFIG_FILE_NAME));
        }
        paths
    }

    /// Resolve the configuration file and environment into a [`Config`].
    ///
    /// An explicit path must exist. Without one, the first discovered
    /// `.yummy.yaml` is used, or the defaults when there is none. Returns the
    /// file that was used, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let source = match explicit {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file '{}' does not exist", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::search_paths().into_iter().find(|p| p.is_file()),
        };

        let mut config = match &source {
            Some(path) => {
                info!(path = %path.display(), "Using config file");
                Self::load(path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    /// Apply `YUMMY_*` overrides through the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("YUMMY_REPO_PATH") {
            self.repo_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("YUMMY_CREATEREPO_BINARY") {
            self.createrepo_binary = PathBuf::from(v);
        }
        if let Some(v) = lookup("YUMMY_RPM_BINARY") {
            self.rpm_binary = PathBuf::from(v);
        }
        if let Some(v) = lookup("YUMMY_HELP_FILE") {
            self.help_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("YUMMY_WORKERS") {
            self.workers = v
                .trim()
                .parse()
                .with_context(|| format!("YUMMY_WORKERS must be a number, got '{v}'"))?;
        }
        if let Some(v) = lookup("YUMMY_PROTECTED") {
            self.protected = parse_bool("YUMMY_PROTECTED", &v)?;
        }
        if let Some(v) = lookup("YUMMY_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("YUMMY_PORT") {
            self.port = v
                .trim()
                .parse()
                .with_context(|| format!("YUMMY_PORT must be a port number, got '{v}'"))?;
        }
        if let Some(v) = lookup("YUMMY_MAX_UPLOAD_SIZE_MB") {
            self.max_upload_size_mb = v.trim().parse().with_context(|| {
                format!("YUMMY_MAX_UPLOAD_SIZE_MB must be a number, got '{v}'")
            })?;
        }
        if let Some(v) = lookup("YUMMY_AUTH_ENABLED") {
            self.auth.enabled = parse_bool("YUMMY_AUTH_ENABLED", &v)?;
        }
        if let Some(v) = lookup("YUMMY_AUTH_USER") {
            self.auth.user = v;
        }
        if let Some(v) = lookup("YUMMY_AUTH_PASSWORD") {
            self.auth.password = v;
        }
        if let Some(v) = lookup("YUMMY_AUTH_PROTECT_UPLOAD") {
            self.auth.protect_upload = parse_bool("YUMMY_AUTH_PROTECT_UPLOAD", &v)?;
        }
        Ok(())
    }

    /// Run the startup checks and resolve tool binaries to absolute paths.
    pub fn validate(mut self) -> Result<Self> {
        let repo = &self.repo_path;
        let metadata = fs::metadata(repo)
            .map_err(|_| anyhow::anyhow!("configured repo path '{}' does not exist", repo.display()))?;
        if !metadata.is_dir() {
            bail!("configured repo path '{}' is not a directory", repo.display());
        }
        if access(repo.as_path(), AccessFlags::W_OK).is_err() {
            bail!("configured repo path '{}' is not writeable", repo.display());
        }

        self.createrepo_binary = resolve_binary("createrepo binary", &self.createrepo_binary)?;
        self.rpm_binary = resolve_binary("rpm binary", &self.rpm_binary)?;

        if !self.help_file.is_file() {
            bail!(
                "configured help file '{}' does not exist",
                self.help_file.display()
            );
        }

        if self.workers == 0 {
            bail!("configured worker count must be at least 1");
        }

        if self.auth.enabled && self.auth.user.is_empty() {
            bail!("authentication is enabled but no user is configured");
        }

        Ok(self)
    }

    /// Get the maximum request body size in bytes.
    pub fn max_upload_size_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// Copy of the configuration that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.auth.password.is_empty() {
            copy.auth.password = "********".to_string();
        }
        copy
    }

    /// Render the configuration as YAML in the file layout.
    pub fn to_yaml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            yum: &'a Config,
        }
        serde_yaml_ng::to_string(&Wrapper { yum: self }).context("Failed to render configuration")
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}

fn resolve_binary(label: &str, binary: &Path) -> Result<PathBuf> {
    let is_path = binary.is_absolute() || binary.components().count() > 1;
    if !is_path {
        return which::which(binary).map_err(|_| {
            anyhow::anyhow!(
                "configured {label} '{}' was not found in PATH",
                binary.display()
            )
        });
    }

    if !binary.exists() {
        bail!("configured {label} '{}' does not exist", binary.display());
    }
    if !binary.is_file() || access(binary, AccessFlags::X_OK).is_err() {
        bail!("configured {label} '{}' is not executable", binary.display());
    }
    Ok(binary.to_path_buf())
}

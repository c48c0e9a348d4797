//! Service identities and the registry that resolves calling contexts to them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Canonical name of the fallback service for unresolved contexts.
pub const UNKNOWN_SERVICE: &str = "UNKNOWN";

/// A calling subsystem identity, used to gate notification authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    extra_paths: Vec<String>,
    #[serde(default)]
    public: bool,
}

impl Service {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_uppercase(),
            path: None,
            extra_paths: Vec::new(),
            public: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_extra_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_SERVICE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_SERVICE
    }

    /// Main path followed by the aliases.
    pub fn all_paths(&self) -> impl Iterator<Item = &str> {
        self.path
            .as_deref()
            .into_iter()
            .chain(self.extra_paths.iter().map(String::as_str))
    }

    /// Whether `identifier` (a name, script name or file path) designates this service.
    ///
    /// Only the basename of `identifier` is considered. It matches when it equals the
    /// service name, or the basename of any registered path with or without extension,
    /// ignoring case.
    pub fn corresponds_with(&self, identifier: &str) -> bool {
        let candidate = basename(identifier).to_lowercase();
        if candidate.is_empty() {
            return false;
        }

        if candidate == self.name.to_lowercase() {
            return true;
        }

        self.all_paths().any(|path| {
            let with_ext = basename(path).to_lowercase();
            let without_ext = Path::new(&with_ext)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            candidate == with_ext || candidate == without_ext
        })
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// What a caller hands to the dispatcher to identify itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceContext {
    /// Already-resolved service.
    Service(Service),
    /// File path, script name or service tag.
    Identifier(String),
}

impl From<Service> for ServiceContext {
    fn from(service: Service) -> Self {
        ServiceContext::Service(service)
    }
}

impl From<&str> for ServiceContext {
    fn from(identifier: &str) -> Self {
        ServiceContext::Identifier(identifier.to_string())
    }
}

impl From<String> for ServiceContext {
    fn from(identifier: String) -> Self {
        ServiceContext::Identifier(identifier)
    }
}

/// Resolves calling contexts to canonical services.
pub trait ServiceResolver: Send + Sync {
    /// Resolve a context. Unmatched contexts resolve to the unknown service.
    fn resolve(&self, context: &ServiceContext) -> Service;

    /// The fallback service used when no context is supplied.
    fn unknown(&self) -> Service {
        Service::unknown()
    }
}

/// Fixed set of services known to the process.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<Service>,
}

impl ServiceRegistry {
    /// Create a registry. The unknown service is appended when missing.
    pub fn new(mut services: Vec<Service>) -> Self {
        if !services.iter().any(Service::is_unknown) {
            services.push(Service::unknown());
        }
        Self { services }
    }

    /// The services run by the Raspberry Pi scripts.
    pub fn builtin() -> Self {
        Self::new(vec![
            Service::new("AEMET")
                .with_path("/home/pi/scripts/aemet.py")
                .public(),
            Service::new("MENUS")
                .with_path("/home/pi/scripts/menus_resi.py")
                .public(),
            Service::new("VCS")
                .with_path("/home/pi/scripts/vcs.py")
                .public(),
            Service::new("LOG").with_extra_paths([
                "/home/pi/scripts/backup.py",
                "/home/pi/scripts/ngrok.py",
                "/home/pi/scripts/ngrok2.py",
                "/home/pi/scripts/reboot.py",
                "/home/pi/scripts/serveo.py",
                "/home/pi/scripts/gestor_mail.py",
                "/home/pi/pull.sh",
            ]),
            Service::new("TELEGRAM_BOT").with_path("/home/pi/scripts/telegram_bot.py"),
            Service::new("CONTROLLER").with_path("/home/pi/scripts/controller.py"),
            Service::unknown(),
        ])
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look up a service by its canonical name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve(&self, context: &ServiceContext) -> Service {
        let identifier = match context {
            ServiceContext::Service(service) => return service.clone(),
            ServiceContext::Identifier(identifier) => identifier,
        };

        tracing::debug!(identifier = %identifier, "resolving service");
        if let Some(service) = self
            .services
            .iter()
            .filter(|s| !s.is_unknown())
            .find(|s| s.corresponds_with(identifier))
        {
            return service.clone();
        }

        tracing::warn!(identifier = %identifier, "unknown service");
        self.unknown()
    }

    fn unknown(&self) -> Service {
        self.get(UNKNOWN_SERVICE)
            .cloned()
            .unwrap_or_else(Service::unknown)
    }
}

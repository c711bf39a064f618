use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.raynucommunitytournament.xyz/api";
pub const DEFAULT_SERVER_BASE_URL: &str = "https://api.raynucommunitytournament.xyz";
pub const DEFAULT_STATIC_FALLBACK_BASE_URL: &str = "../api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

const DEFAULT_TEAM_LOGO: &str = "../Image/team.png";
const DEFAULT_CASTER_PHOTO: &str = "../Image/caster.png";
const DEFAULT_TOURNAMENT_LOGO: &str = "../Image/logo.png";

/// Paths under these roots are served by the site itself and never rebased
/// onto the API server.
const LOCAL_ASSET_ROOTS: [&str; 7] = ["image", "images", "img", "css", "js", "music", "docs"];

/// Placeholder images used when a document has no asset of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKey {
    TeamLogo,
    CasterPhoto,
    TournamentLogo,
}

impl AssetKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "teamLogo" => Some(AssetKey::TeamLogo),
            "casterPhoto" => Some(AssetKey::CasterPhoto),
            "tournamentLogo" => Some(AssetKey::TournamentLogo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAssets {
    pub team_logo: String,
    pub caster_photo: String,
    pub tournament_logo: String,
}

impl Default for DefaultAssets {
    fn default() -> Self {
        Self {
            team_logo: DEFAULT_TEAM_LOGO.into(),
            caster_photo: DEFAULT_CASTER_PHOTO.into(),
            tournament_logo: DEFAULT_TOURNAMENT_LOGO.into(),
        }
    }
}

/// Where the site's data and media live. Resolved once at startup and passed
/// to every consumer.
///
/// An empty base URL disables that base. This is distinct from leaving it
/// unset, which selects the built-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub api_base_url: String,
    pub server_base_url: String,
    pub static_fallback_base_url: String,
    pub default_assets: DefaultAssets,
    pub http_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            server_base_url: DEFAULT_SERVER_BASE_URL.into(),
            static_fallback_base_url: DEFAULT_STATIC_FALLBACK_BASE_URL.into(),
            default_assets: DefaultAssets::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl SiteConfig {
    /// Defaults overlaid with `RAYNU_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        // Set-but-empty is meaningful for base URLs, so no emptiness filter.
        let base = |key: &str, fallback: String| lookup(key).map(|v| v.trim().to_string()).unwrap_or(fallback);
        let asset = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        Self {
            api_base_url: base("RAYNU_API_BASE_URL", defaults.api_base_url),
            server_base_url: base("RAYNU_SERVER_BASE_URL", defaults.server_base_url),
            static_fallback_base_url: base(
                "RAYNU_STATIC_BASE_URL",
                defaults.static_fallback_base_url,
            ),
            default_assets: DefaultAssets {
                team_logo: asset("RAYNU_TEAM_LOGO", defaults.default_assets.team_logo),
                caster_photo: asset("RAYNU_CASTER_PHOTO", defaults.default_assets.caster_photo),
                tournament_logo: asset(
                    "RAYNU_TOURNAMENT_LOGO",
                    defaults.default_assets.tournament_logo,
                ),
            },
            http_timeout: lookup("RAYNU_HTTP_TIMEOUT_SECS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|value| *value > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        }
    }

    /// Absolute URL of a live API endpoint. `"teams"` and `"/teams"` are the
    /// same endpoint; an empty endpoint yields the base itself.
    pub fn build_api_url(&self, endpoint: &str) -> String {
        let base = match self.api_base_url.trim() {
            "" => DEFAULT_API_BASE_URL,
            b => b,
        };
        let base = base.strip_suffix('/').unwrap_or(base);
        if endpoint.is_empty() {
            return base.to_string();
        }
        format!("{base}{}", normalize_endpoint(endpoint))
    }

    /// Live endpoint URL, or `None` when the API base is disabled.
    pub fn remote_url(&self, endpoint: &str) -> Option<String> {
        let base = trim_base(&self.api_base_url)?;
        Some(format!("{base}{}", normalize_endpoint(endpoint)))
    }

    /// Location of the static JSON mirror for an endpoint, or `None` when the
    /// mirror is disabled.
    pub fn static_mirror_url(&self, endpoint: &str) -> Option<String> {
        let base = trim_base(&self.static_fallback_base_url)?;
        let normalized = normalize_endpoint(endpoint);
        let file = normalized.trim_start_matches('/');
        let file = strip_suffix_ignore_case(file, ".json");
        Some(format!("{base}/{file}.json"))
    }

    /// Turn a stored asset path into something displayable.
    pub fn resolve_media_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        let lower = path.to_ascii_lowercase();
        if ["data:", "http:", "https:"].iter().any(|p| lower.starts_with(p)) {
            return path.to_string();
        }

        let server = self.server_base_url.trim();
        let server = server.strip_suffix('/').unwrap_or(server);

        if path.starts_with('/') {
            if is_local_asset(&lower) || server.is_empty() {
                return path.to_string();
            }
            return format!("{server}{path}");
        }

        if server.is_empty() {
            return path.to_string();
        }
        format!("{server}/{path}")
    }

    pub fn default_asset(&self, key: AssetKey) -> &str {
        match key {
            AssetKey::TeamLogo => &self.default_assets.team_logo,
            AssetKey::CasterPhoto => &self.default_assets.caster_photo,
            AssetKey::TournamentLogo => &self.default_assets.tournament_logo,
        }
    }

    /// Same as [`SiteConfig::default_asset`] but keyed by the site's asset
    /// name. Unknown names have no default.
    pub fn default_asset_named(&self, name: &str) -> &str {
        AssetKey::from_name(name).map_or("", |k| self.default_asset(k))
    }

    /// Resolve `path`, substituting the placeholder for `key` when there is
    /// nothing to show.
    pub fn with_default(&self, path: Option<&str>, key: AssetKey) -> String {
        let resolved = path.map(|p| self.resolve_media_url(p)).unwrap_or_default();
        if resolved.is_empty() {
            self.default_asset(key).to_string()
        } else {
            resolved
        }
    }
}

impl fmt::Display for SiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |s: &str| if s.is_empty() { "(disabled)".to_string() } else { s.to_string() };
        writeln!(f, "api base:        {}", show(&self.api_base_url))?;
        writeln!(f, "server base:     {}", show(&self.server_base_url))?;
        writeln!(f, "static mirror:   {}", show(&self.static_fallback_base_url))?;
        writeln!(f, "team logo:       {}", self.default_assets.team_logo)?;
        writeln!(f, "caster photo:    {}", self.default_assets.caster_photo)?;
        writeln!(f, "tournament logo: {}", self.default_assets.tournament_logo)?;
        write!(f, "http timeout:    {}s", self.http_timeout.as_secs())
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.is_empty() {
        "/".to_string()
    } else if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

fn trim_base(base: &str) -> Option<&str> {
    let base = base.trim();
    if base.is_empty() {
        return None;
    }
    Some(base.strip_suffix('/').unwrap_or(base))
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> &'a str {
    let split = s.len().saturating_sub(suffix.len());
    match (s.get(..split), s.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(suffix) => head,
        _ => s,
    }
}

/// `lower` is an already lower-cased, `/`-rooted path.
fn is_local_asset(lower: &str) -> bool {
    let Some(rest) = lower.strip_prefix('/') else {
        return false;
    };
    LOCAL_ASSET_ROOTS.iter().any(|root| {
        rest.strip_prefix(root)
            .is_some_and(|after| after.starts_with('/'))
    })
}

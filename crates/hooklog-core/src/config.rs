use std::{env, fs, path::Path, str::FromStr, time::Duration};

use url::Url;

use crate::{
    errors::Error,
    layout::{TemplateLayout, DEFAULT_LAYOUT},
    Result,
};

pub const DEFAULT_MENTION: &str = "@everyone";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed configuration for one webhook sink.
///
/// Immutable once a sink is built from it. `webhook_id` and `webhook_token` are
/// required; everything else has a default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    // Destination
    pub webhook_id: u64,
    pub webhook_token: String,

    // Presentation
    pub use_cards: bool,
    pub mention_enabled: bool,
    pub mention_text: String,
    pub layout: String,

    // Transport
    pub timeout: Duration,
}

impl SinkConfig {
    pub fn new(webhook_id: u64, webhook_token: impl Into<String>) -> Self {
        Self {
            webhook_id,
            webhook_token: webhook_token.into(),
            use_cards: true,
            mention_enabled: false,
            mention_text: DEFAULT_MENTION.to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse `https://discord.com/api/webhooks/{id}/{token}` (query string ignored).
    pub fn from_webhook_url(url: &str) -> Result<Self> {
        let (id, token) = parse_webhook_url(url)?;
        Ok(Self::new(id, token))
    }

    /// Load from `HOOKLOG_*` environment variables (and `.env` if present).
    pub fn load() -> Result<Self> {
        load_dotenv(Path::new(".env"));
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = match env_value("HOOKLOG_WEBHOOK_URL") {
            Some(url) => Self::from_webhook_url(&url)?,
            None => {
                let id = match env_value("HOOKLOG_WEBHOOK_ID") {
                    Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                        Error::Config(format!("HOOKLOG_WEBHOOK_ID is not a valid id: {raw:?}"))
                    })?,
                    None => {
                        return Err(Error::Config(
                            "HOOKLOG_WEBHOOK_ID (or HOOKLOG_WEBHOOK_URL) environment variable is required"
                                .to_string(),
                        ))
                    }
                };
                let token = env_value("HOOKLOG_WEBHOOK_TOKEN").unwrap_or_default();
                Self::new(id, token)
            }
        };

        if let Some(v) = env_flag("HOOKLOG_USE_CARDS") {
            cfg.use_cards = v;
        }
        if let Some(v) = env_flag("HOOKLOG_MENTION_ENABLED") {
            cfg.mention_enabled = v;
        }
        if let Some(v) = env_value("HOOKLOG_MENTION_TEXT") {
            cfg.mention_text = v;
        }
        if let Some(v) = env_value("HOOKLOG_LAYOUT") {
            cfg.layout = v;
        }
        if let Some(ms) = env_parse::<u64>("HOOKLOG_TIMEOUT_MS") {
            cfg.timeout = Duration::from_millis(ms);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_cards(mut self, use_cards: bool) -> Self {
        self.use_cards = use_cards;
        self
    }

    pub fn with_mention(mut self, mention_text: impl Into<String>) -> Self {
        self.mention_enabled = true;
        self.mention_text = mention_text.into();
        self
    }

    pub fn with_mentions_enabled(mut self, enabled: bool) -> Self {
        self.mention_enabled = enabled;
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail fast on missing identity/credential or a broken layout.
    pub fn validate(&self) -> Result<()> {
        self.validate_destination()?;
        TemplateLayout::parse(&self.layout)?;
        Ok(())
    }

    /// Checks only what a transport needs: id, token and timeout.
    pub fn validate_destination(&self) -> Result<()> {
        if self.webhook_id == 0 {
            return Err(Error::Config("webhook id is required".to_string()));
        }
        if self.webhook_token.trim().is_empty() {
            return Err(Error::Config("webhook token is required".to_string()));
        }
        if !is_valid_token(&self.webhook_token) {
            return Err(Error::Config(
                "webhook token may only contain [A-Za-z0-9._-]".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// The mention token to append, if mentions are enabled.
    pub fn mention(&self) -> Option<&str> {
        self.mention_enabled.then_some(self.mention_text.as_str())
    }
}

/// Tokens end up verbatim in the request path.
fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn parse_webhook_url(raw: &str) -> Result<(u64, String)> {
    let invalid = |why: &str| Error::Config(format!("not a webhook url ({why}): {raw:?}"));

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    let segments = url
        .path_segments()
        .ok_or_else(|| invalid("no path"))?
        .collect::<Vec<_>>();
    let mut tail = segments.iter().rev().skip_while(|s| s.is_empty());
    let (Some(token), Some(id), Some(&"webhooks")) = (tail.next(), tail.next(), tail.next())
    else {
        return Err(invalid("expected /webhooks/{id}/{token}"));
    };

    if !is_valid_token(token) {
        return Err(invalid("token has characters outside [A-Za-z0-9._-]"));
    }
    let id = id.parse::<u64>().map_err(|_| invalid("id is not numeric"))?;
    Ok((id, token.to_string()))
}

/// Apply `KEY=value` lines from a dotenv file; variables already set win.
fn load_dotenv(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, value) in contents.lines().filter_map(parse_dotenv_line) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q));
    Some((key, unquoted.unwrap_or(value)))
}

/// Non-blank value of an environment variable.
fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    let v = env_value(key)?.trim().to_ascii_lowercase();
    Some(matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_value(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SinkConfig::new(42, "tok");
        assert!(cfg.use_cards);
        assert!(!cfg.mention_enabled);
        assert_eq!(cfg.mention_text, "@everyone");
        assert_eq!(cfg.layout, "${message}");
        assert_eq!(cfg.mention(), None);
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_identity_fails_validation() {
        assert!(matches!(
            SinkConfig::new(0, "tok").validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SinkConfig::new(7, "  ").validate(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn bad_layout_fails_validation() {
        let cfg = SinkConfig::new(7, "tok").with_layout("${nope}");
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn parses_webhook_urls() {
        let cfg = SinkConfig::from_webhook_url(
            "https://discord.com/api/webhooks/123456/abc-DEF_9?wait=true",
        )
        .unwrap();
        assert_eq!(cfg.webhook_id, 123456);
        assert_eq!(cfg.webhook_token, "abc-DEF_9");

        let cfg = SinkConfig::from_webhook_url("https://discord.com/api/webhooks/1/t/").unwrap();
        assert_eq!((cfg.webhook_id, cfg.webhook_token.as_str()), (1, "t"));

        assert!(SinkConfig::from_webhook_url("https://discord.com/api/x/1/t").is_err());
        assert!(SinkConfig::from_webhook_url("https://discord.com/api/webhooks/abc/t").is_err());
        assert!(SinkConfig::from_webhook_url("not a url").is_err());
    }

    #[test]
    fn rejects_malformed_webhook_urls() {
        for url in [
            "webhooks/1/t",
            "discord.com/api/webhooks/1/t",
            "ftp://evil/webhooks/7/tok",
            "file:///webhooks/7/tok",
            "https://example.com/x/webhooks/3/a b",
            "https://example.com/webhooks/3/a%2Fb",
            "https://example.com/webhooks/3/",
        ] {
            let err = SinkConfig::from_webhook_url(url).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{url}: {err}");
        }
    }

    #[test]
    fn destination_check_ignores_layout() {
        let cfg = SinkConfig::new(7, "tok").with_layout("${nope}");
        cfg.validate_destination().unwrap();
        assert!(SinkConfig::new(7, "a/b").validate_destination().is_err());
        assert!(SinkConfig::new(7, "tok")
            .with_timeout(Duration::ZERO)
            .validate_destination()
            .is_err());
    }

    #[test]
    fn dotenv_lines() {
        assert_eq!(parse_dotenv_line("A=1"), Some(("A", "1")));
        assert_eq!(parse_dotenv_line("  B = \"two words\" "), Some(("B", "two words")));
        assert_eq!(parse_dotenv_line("C='x'"), Some(("C", "x")));
        assert_eq!(parse_dotenv_line("# D=1"), None);
        assert_eq!(parse_dotenv_line("=v"), None);
        assert_eq!(parse_dotenv_line(""), None);
    }

    mod from_env_vars {
        use std::{env, io::Write, sync::Mutex, time::Duration};

        use crate::{
            config::{load_dotenv, SinkConfig},
            errors::Error,
        };

        // Tests in this module mutate process-wide environment variables.
        static ENV_LOCK: Mutex<()> = Mutex::new(());

        const VARS: &[&str] = &[
            "HOOKLOG_WEBHOOK_URL",
            "HOOKLOG_WEBHOOK_ID",
            "HOOKLOG_WEBHOOK_TOKEN",
            "HOOKLOG_USE_CARDS",
            "HOOKLOG_MENTION_ENABLED",
            "HOOKLOG_MENTION_TEXT",
            "HOOKLOG_LAYOUT",
            "HOOKLOG_TIMEOUT_MS",
            "HOOKLOG_DOTENV_A",
            "HOOKLOG_DOTENV_B",
        ];

        fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
            let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            for key in VARS {
                env::remove_var(key);
            }
            for (key, value) in vars {
                env::set_var(key, value);
            }
            let out = f();
            for key in VARS {
                env::remove_var(key);
            }
            out
        }

        #[test]
        fn url_takes_precedence_over_id_and_token() {
            let cfg = with_env(
                &[
                    ("HOOKLOG_WEBHOOK_URL", "https://discord.com/api/webhooks/11/from-url"),
                    ("HOOKLOG_WEBHOOK_ID", "22"),
                    ("HOOKLOG_WEBHOOK_TOKEN", "from-vars"),
                ],
                SinkConfig::from_env,
            )
            .unwrap();

            assert_eq!(cfg.webhook_id, 11);
            assert_eq!(cfg.webhook_token, "from-url");
        }

        #[test]
        fn id_and_token_vars() {
            let cfg = with_env(
                &[("HOOKLOG_WEBHOOK_ID", " 22 "), ("HOOKLOG_WEBHOOK_TOKEN", "tok")],
                SinkConfig::from_env,
            )
            .unwrap();

            assert_eq!(cfg, SinkConfig::new(22, "tok"));
        }

        #[test]
        fn missing_id_is_config_error() {
            let err = with_env(&[("HOOKLOG_WEBHOOK_TOKEN", "tok")], SinkConfig::from_env)
                .unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }

        #[test]
        fn non_numeric_id_is_config_error() {
            let err = with_env(
                &[("HOOKLOG_WEBHOOK_ID", "abc"), ("HOOKLOG_WEBHOOK_TOKEN", "tok")],
                SinkConfig::from_env,
            )
            .unwrap_err();
            assert!(matches!(err, Error::Config(msg) if msg.contains("abc")));
        }

        #[test]
        fn presentation_and_timeout_overrides() {
            let cfg = with_env(
                &[
                    ("HOOKLOG_WEBHOOK_ID", "5"),
                    ("HOOKLOG_WEBHOOK_TOKEN", "tok"),
                    ("HOOKLOG_USE_CARDS", "false"),
                    ("HOOKLOG_MENTION_ENABLED", "YES"),
                    ("HOOKLOG_MENTION_TEXT", " @here"),
                    ("HOOKLOG_LAYOUT", "[${level}] ${message}"),
                    ("HOOKLOG_TIMEOUT_MS", "2500"),
                ],
                SinkConfig::from_env,
            )
            .unwrap();

            assert!(!cfg.use_cards);
            assert_eq!(cfg.mention(), Some(" @here"));
            assert_eq!(cfg.layout, "[${level}] ${message}");
            assert_eq!(cfg.timeout, Duration::from_millis(2500));
        }

        #[test]
        fn invalid_layout_from_env_is_rejected() {
            let err = with_env(
                &[
                    ("HOOKLOG_WEBHOOK_ID", "5"),
                    ("HOOKLOG_WEBHOOK_TOKEN", "tok"),
                    ("HOOKLOG_LAYOUT", "${callsite}"),
                ],
                SinkConfig::from_env,
            )
            .unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }

        #[test]
        fn dotenv_does_not_override_existing_vars() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "# comment").unwrap();
            writeln!(file, "HOOKLOG_DOTENV_A=from-file").unwrap();
            writeln!(file, "HOOKLOG_DOTENV_B=\"quoted value\"").unwrap();
            file.flush().unwrap();

            let (a, b) = with_env(&[("HOOKLOG_DOTENV_A", "from-process")], || {
                load_dotenv(file.path());
                (
                    env::var("HOOKLOG_DOTENV_A").unwrap(),
                    env::var("HOOKLOG_DOTENV_B").unwrap(),
                )
            });

            assert_eq!(a, "from-process");
            assert_eq!(b, "quoted value");
        }

        #[test]
        fn missing_dotenv_file_is_ignored() {
            let dir = tempfile::tempdir().unwrap();
            with_env(&[], || load_dotenv(&dir.path().join(".env")));
        }
    }

    #[test]
    fn with_mention_enables_mentions() {
        let cfg = SinkConfig::new(1, "t").with_mention("@here");
        assert_eq!(cfg.mention(), Some("@here"));
        let cfg = cfg.with_mentions_enabled(false);
        assert_eq!(cfg.mention(), None);
    }
}

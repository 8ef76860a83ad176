#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CargoEnv {
    Development,
    Production,
}

impl CargoEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

pub const DEFAULT_EPG_URL: &str = "https://epgshare01.online/epgshare01/epg_ripper_US1.xml";
pub const DEFAULT_FALLBACK_UPSTREAM: &str = "https://strm.poocloud.in";
pub const DEFAULT_BYPASS_HOSTS: &str = "strm.poocloud.in";
pub const DEFAULT_BYPASS_ORIGIN: &str = "https://modistreams.org";

#[derive(clap::Parser, Debug, Clone)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // the xmltv document that /epg filters, fetched in full on every request
    #[clap(long, env, default_value = DEFAULT_EPG_URL)]
    pub epg_url: String,

    // unmatched paths get glued onto this, so /hls/abc.m3u8 becomes <this>/hls/abc.m3u8
    #[clap(long, env, default_value = DEFAULT_FALLBACK_UPSTREAM)]
    pub fallback_upstream: String,

    // turns the fallback off, unmatched paths then 404
    #[clap(long, env)]
    pub disable_fallback: bool,

    // comma seperated hosts that need the referer/origin spoof, subdomains match too
    #[clap(long, env, default_value = DEFAULT_BYPASS_HOSTS, value_delimiter = ',')]
    pub bypass_hosts: Vec<String>,

    // what the protected cdn accepts as origin, referer gets the same value with a trailing slash
    #[clap(long, env, default_value = DEFAULT_BYPASS_ORIGIN)]
    pub bypass_origin: String,

    // only the connect is bounded, segment bodies can take as long as they need
    #[clap(long, env, default_value = "10")]
    pub upstream_connect_timeout_secs: u64,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl Default for AppConfig {
    // mostly for tests, the real values come from clap
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            epg_url: DEFAULT_EPG_URL.to_string(),
            fallback_upstream: DEFAULT_FALLBACK_UPSTREAM.to_string(),
            disable_fallback: false,
            bypass_hosts: vec![DEFAULT_BYPASS_HOSTS.to_string()],
            bypass_origin: DEFAULT_BYPASS_ORIGIN.to_string(),
            upstream_connect_timeout_secs: 10,
            sentry_dsn: None,
        }
    }
}

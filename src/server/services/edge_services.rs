use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use crate::{
    config::AppConfig,
    server::utils::header_utils::BypassPolicy,
};

use super::{
    epg_services::{DynEpgService, EpgService},
    relay_services::{DynRelayService, RelayService},
};

/// everything a handler can reach, built once at startup and cloned into each request
#[derive(Clone)]
pub struct EdgeServices {
    pub relay: DynRelayService,
    pub epg: DynEpgService,
    pub config: Arc<AppConfig>,
}

impl EdgeServices {
    pub fn new(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        info!("starting edge services...");

        let connect_timeout = Duration::from_secs(config.upstream_connect_timeout_secs);

        // the relay follows redirects itself so every hop gets its own Host and bypass headers
        let relay_http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build relay http client")?;

        let epg_http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build EPG http client")?;

        let bypass = BypassPolicy::from_config(&config);
        info!("bypass headers enabled for {:?}", config.bypass_hosts);

        let relay = Arc::new(RelayService::new(relay_http, bypass)) as DynRelayService;
        let epg = Arc::new(EpgService::new(epg_http, config.epg_url.clone())) as DynEpgService;

        Ok(Self { relay, epg, config })
    }
}

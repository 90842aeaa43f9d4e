//! Runtime capability probe
//!
//! Some edge/CDN layers terminate long-lived connections, which makes the
//! push channel flap forever. The probe inspects what the host already knows
//! about its request path and says whether push should be skipped entirely.
//! It performs no I/O.

/// Facts about the runtime environment gathered once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeProbe {
    /// Public hostname the app is served from
    pub hostname: Option<String>,
    /// Names of cookies present on the session
    pub cookie_names: Vec<String>,
}

/// Hostname suffixes of edge platforms known to cut websocket upgrades
const EDGE_HOST_SUFFIXES: &[&str] = &[
    ".pages.dev",
    ".workers.dev",
    ".netlify.app",
    ".edgecompute.app",
];

/// Cookies set by bot-management / edge proxies in front of the app
const EDGE_COOKIE_NAMES: &[&str] = &["__cf_bm", "cf_clearance", "__cfruid", "ak_bmsc"];

/// Whether the app runs behind an edge layer that breaks push connections.
pub fn detect_edge_proxy(probe: &RuntimeProbe) -> bool {
    let host_match = probe.hostname.as_deref().is_some_and(|host| {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        EDGE_HOST_SUFFIXES
            .iter()
            .any(|suffix| host.ends_with(suffix))
    });

    let cookie_match = probe.cookie_names.iter().any(|name| {
        EDGE_COOKIE_NAMES
            .iter()
            .any(|edge| name.eq_ignore_ascii_case(edge))
    });

    host_match || cookie_match
}

/// Combine the explicit operator flag with the probe result.
pub fn force_polling_from(flag: bool, probe: &RuntimeProbe) -> bool {
    flag || detect_edge_proxy(probe)
}

/// Interpret a `TABLE_SYNC_FORCE_POLLING`-style value.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

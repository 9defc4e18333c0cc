use std::collections::BTreeMap;
use std::net::{IpAddr, ToSocketAddrs};

use chrono::Local;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::config::ReporterConfig;
use crate::incident::Incident;

pub const MAX_ENV_VALUE_CHARS: usize = 300;
pub const TRUNCATION_MARKER: &str = "... (truncated)";
pub const UNAVAILABLE: &str = "unavailable";
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsFacts {
    pub os_name: String,
    pub os_version: String,
    pub os_release: String,
    pub architecture: String,
    pub machine: String,
    pub processor: String,
    pub runtime_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub hostname: String,
    pub ip_address: String,
}

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub app_name: String,
    pub app_version: String,
    pub timestamp: String,
    pub command_line_args: Vec<String>,
    pub environment_variables: BTreeMap<String, String>,
    pub installed_packages: BTreeMap<String, String>,
    pub network_info: NetworkIdentity,
    pub traceback: Option<String>,
    pub user_notes: Option<String>,
    pub os_data: OsFacts,
}

/// Gathers an [`ErrorReport`] from the running process.
#[derive(Debug, Clone)]
pub struct Collector {
    env_allow_list: Vec<String>,
    dependencies: BTreeMap<String, String>,
}

impl Collector {
    pub fn new(env_allow_list: Vec<String>) -> Self {
        let mut dependencies = BTreeMap::new();
        dependencies.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            env_allow_list,
            dependencies,
        }
    }

    /// Add components to the dependency inventory, e.g. the host's crates.
    pub fn with_dependencies<I, K, V>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dependencies
            .extend(deps.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn collect(&self, config: &ReporterConfig, incident: Option<&Incident>) -> ErrorReport {
        self.collect_with(config, incident, |name| std::env::var(name).ok())
    }

    /// Same as [`collect`](Self::collect) with an injectable environment.
    pub fn collect_with(
        &self,
        config: &ReporterConfig,
        incident: Option<&Incident>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ErrorReport {
        let report = ErrorReport {
            app_name: config.app_name.clone(),
            app_version: config.app_version.clone(),
            timestamp: Local::now().to_rfc3339(),
            command_line_args: std::env::args_os()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            environment_variables: capture_env(&self.env_allow_list, lookup),
            installed_packages: self.dependencies.clone(),
            network_info: network_identity(),
            traceback: incident.map(|i| i.traceback.clone()),
            user_notes: None,
            os_data: os_facts(),
        };
        tracing::debug!(
            env_vars = report.environment_variables.len(),
            packages = report.installed_packages.len(),
            hostname = %report.network_info.hostname,
            "collected error report"
        );
        report
    }
}

/// Pick the allow-listed variables that are set, truncating long values.
pub fn capture_env(
    allow_list: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    allow_list
        .iter()
        .filter_map(|name| lookup(name).map(|value| (name.clone(), truncate_value(&value))))
        .collect()
}

/// Keep the first 300 characters and mark the cut.
pub fn truncate_value(value: &str) -> String {
    match value.char_indices().nth(MAX_ENV_VALUE_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &value[..cut]),
        None => value.to_string(),
    }
}

pub fn os_facts() -> OsFacts {
    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    let processor = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    OsFacts {
        os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        os_version: System::os_version().unwrap_or_else(|| UNKNOWN.to_string()),
        os_release: System::kernel_version().unwrap_or_else(|| UNKNOWN.to_string()),
        architecture: format!("{}bit", usize::BITS),
        machine: std::env::consts::ARCH.to_string(),
        processor,
        runtime_version: env!("CRASHNOTE_RUSTC_VERSION").to_string(),
    }
}

pub fn network_identity() -> NetworkIdentity {
    let Some(hostname) = System::host_name().filter(|h| !h.is_empty()) else {
        tracing::warn!("hostname unavailable");
        return NetworkIdentity {
            hostname: UNAVAILABLE.to_string(),
            ip_address: UNAVAILABLE.to_string(),
        };
    };

    let ip_address = match resolve(&hostname) {
        Some(ip) => ip.to_string(),
        None => {
            tracing::warn!(%hostname, "could not resolve hostname");
            UNAVAILABLE.to_string()
        }
    };

    NetworkIdentity {
        hostname,
        ip_address,
    }
}

/// First address for `host`, IPv4 preferred.
fn resolve(host: &str) -> Option<IpAddr> {
    let addrs: Vec<IpAddr> = (host, 0).to_socket_addrs().ok()?.map(|a| a.ip()).collect();
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

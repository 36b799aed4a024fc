//! CLI / environment configuration (spec §6). Grounded on
//! cli/ghostctl/src/main.rs's `#[derive(Parser)]` `Cli` and
//! original_source/cmd/image-cache-daemon.go's flag set, with `POD_*`
//! environment fallbacks matching the daemon's `--node-name` / `--pod-name`
//! / `--pod-uid` / `--pod-namespace` defaults.

use std::time::Duration;

use clap::Parser;

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_duration(raw).map_err(|err| err.to_string())
}

/// Minimal duration parser accepting `0`, `15m`, `2h`, `90s` — no external
/// crate pulled in solely for this; the format the original flag set uses
/// (`15m`) is a small enough grammar to parse directly.
fn humantime_duration(raw: &str) -> Result<Duration, &'static str> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }

    let (number, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit()).ok_or("missing unit")?);
    let number: u64 = number.parse().map_err(|_| "not a number")?;

    let seconds = match unit {
        "s" => number,
        "m" => number * 60,
        "h" => number * 3600,
        _ => return Err("unrecognized duration unit (expected s, m, or h)"),
    };

    Ok(Duration::from_secs(seconds))
}

/// Per-node image-cache-daemon configuration (spec §6).
#[derive(Debug, Parser, Clone)]
#[command(name = "image-cache-daemon", about = "Pre-fetches container images onto the node it runs on")]
pub struct Config {
    /// Seeds the static source. Repeatable.
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// The node this daemon, and every pull workload it creates, runs on.
    #[arg(long, env = "POD_NODE_NAME")]
    pub node_name: String,

    /// This daemon's own pod name, used as the owner reference and pull
    /// workload name prefix.
    #[arg(long, env = "POD_NAME")]
    pub pod_name: String,

    /// This daemon's own pod UID, used in the owner reference.
    #[arg(long, env = "POD_UID")]
    pub pod_uid: String,

    /// This daemon's own pod namespace.
    #[arg(long, env = "POD_NAMESPACE")]
    pub pod_namespace: String,

    /// The image carrying the warden (no-op) binary copied into every pull
    /// workload's init container.
    #[arg(long)]
    pub warden_image: String,

    /// Label selector for the configuration-object source.
    #[arg(long, default_value = "app.kubernetes.io/part-of=image-cache-daemon")]
    pub configmap_selector: String,

    #[arg(long, default_value_t = true)]
    pub watch_argo_workflow_templates: bool,

    #[arg(long, default_value_t = true)]
    pub watch_argo_cluster_workflow_templates: bool,

    #[arg(long, default_value_t = true)]
    pub watch_argo_cron_workflows: bool,

    #[arg(long, default_value_t = true)]
    pub watch_configmaps: bool,

    /// Resync period for every watch-based source and the static source's
    /// republish period. 0 disables resync.
    #[arg(long, value_parser = parse_duration, default_value = "15m")]
    pub resync_period: Duration,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parses CLI args and environment variables (`clap`'s `env` fallback).
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Splits `key=value` into a configuration-object label selector.
    pub fn configmap_selector_parts(&self) -> Result<(String, String), String> {
        let (key, value) = self
            .configmap_selector
            .split_once('=')
            .ok_or_else(|| format!("invalid --configmap-selector {:?}, expected key=value", self.configmap_selector))?;
        Ok((key.to_string(), value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_unrecognized_unit() {
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn splits_selector_into_key_value() {
        let config = Config {
            images: vec![],
            node_name: "node".into(),
            pod_name: "pod".into(),
            pod_uid: "uid".into(),
            pod_namespace: "ns".into(),
            warden_image: "warden".into(),
            configmap_selector: "app.kubernetes.io/part-of=image-cache-daemon".into(),
            watch_argo_workflow_templates: true,
            watch_argo_cluster_workflow_templates: true,
            watch_argo_cron_workflows: true,
            watch_configmaps: true,
            resync_period: Duration::from_secs(900),
            log_level: "info".into(),
        };

        assert_eq!(
            config.configmap_selector_parts().unwrap(),
            ("app.kubernetes.io/part-of".to_string(), "image-cache-daemon".to_string())
        );
    }
}

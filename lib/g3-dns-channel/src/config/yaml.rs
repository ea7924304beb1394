/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::Yaml;

use super::ChannelConfig;
use crate::ResolveMode;

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn as_u32(v: &Yaml) -> anyhow::Result<u32> {
    match v {
        Yaml::String(s) => Ok(u32::from_str(s)?),
        Yaml::Integer(i) => Ok(u32::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'u32' should be 'string' or 'integer'"
        )),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Boolean(value) => Ok(*value),
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

/// Integers are taken as milliseconds, strings may carry a unit.
fn as_timeout(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                let ms = u64::from_str(value).map_err(|_| anyhow!("invalid duration string"))?;
                Ok(Duration::from_millis(ms))
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            let ms = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(Duration::from_millis(ms))
        }
        _ => Err(anyhow!(
            "yaml value type for timeout should be 'string' or 'integer'"
        )),
    }
}

impl ChannelConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!("yaml value type for channel config should be 'map'"));
        };
        let mut config = ChannelConfig::default();
        for (k, v) in map.iter() {
            let Yaml::String(k) = k else {
                return Err(anyhow!("yaml key type should be 'string'"));
            };
            config
                .set_by_yaml_kv(k, v)
                .context(format!("failed to parse key {k}"))?;
        }
        config.check()?;
        Ok(config)
    }

    pub fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "server" | "servers" => match v {
                Yaml::String(addrs) => {
                    self.set_servers_csv(addrs)?;
                    Ok(())
                }
                Yaml::Array(seq) => {
                    let mut servers = Vec::with_capacity(seq.len());
                    for (i, v) in seq.iter().enumerate() {
                        let Yaml::String(s) = v else {
                            return Err(anyhow!("invalid value type for server #{i}"));
                        };
                        servers.push(super::parse_server(s)?);
                    }
                    self.servers = servers;
                    Ok(())
                }
                _ => Err(anyhow!("invalid yaml value type, expect string / array")),
            },
            "query_timeout" | "timeout" => {
                self.query_timeout = as_timeout(v)?;
                Ok(())
            }
            "tries" => {
                self.tries = as_u32(v)?;
                Ok(())
            }
            "rotate" | "round_robin" => {
                self.rotate = as_bool(v)?;
                Ok(())
            }
            "resolve_mode" | "mode" => match v {
                Yaml::String(s) => {
                    self.resolve_mode = ResolveMode::from_str(s)?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid yaml value type for resolve mode")),
            },
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use yaml_rust::YamlLoader;

    fn load(s: &str) -> Yaml {
        YamlLoader::load_from_str(s).unwrap().remove(0)
    }

    #[test]
    fn parse_ok() {
        let yaml = load(
            r#"
                server: "8.8.8.8 8.8.4.4:5353"
                query-timeout: 2s
                tries: 2
                round_robin: true
                resolve_mode: ipv6_first
            "#,
        );
        let config = ChannelConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(
            config.servers(),
            &[
                SocketAddr::from_str("8.8.8.8:53").unwrap(),
                SocketAddr::from_str("8.8.4.4:5353").unwrap(),
            ]
        );
        assert_eq!(config.query_timeout(), Duration::from_secs(2));
        assert_eq!(config.tries, 2);
        assert!(config.rotate);
        assert_eq!(config.resolve_mode(), ResolveMode::Ipv6First);

        let yaml = load(
            r#"
                servers: ["1.1.1.1", "[2606:4700::1111]:53"]
                timeout: 1500
            "#,
        );
        let config = ChannelConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.servers().len(), 2);
        assert_eq!(config.query_timeout(), Duration::from_millis(1500));
        assert_eq!(config.resolve_mode(), ResolveMode::Both);
    }

    #[test]
    fn parse_err() {
        let yaml = load(
            r#"
                server: 123
                timeout: -1
                tries: "many"
                rotate: "sometimes"
                resolve_mode: ipv5_only
                invalid_key: "value"
            "#,
        );
        let mut config = ChannelConfig::default();
        let Yaml::Hash(map) = &yaml else {
            panic!("not a map");
        };
        for (k, v) in map.iter() {
            assert!(config.set_by_yaml_kv(k.as_str().unwrap(), v).is_err());
        }
        assert_eq!(config, ChannelConfig::default());

        let yaml = load("servers: [456]");
        assert!(ChannelConfig::parse_yaml(&yaml).is_err());

        let yaml = load("timeout: 1ms");
        assert!(ChannelConfig::parse_yaml(&yaml).is_err());

        assert!(ChannelConfig::parse_yaml(&load("- a")).is_err());
    }
}

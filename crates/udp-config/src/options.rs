use std::collections::HashMap;
use std::env;

/// Resolves a setting from three layers, highest priority first: CLI
/// argument, environment variable `udp_<script_stem>_<key>`, project option
/// string (a flat `key=value,key=value` list carried in `.project` config).
#[derive(Debug, Clone, Default)]
pub struct Options {
    script_stem: String,
    project: HashMap<String, String>,
    cli: HashMap<String, String>,
}

impl Options {
    pub fn new(script_stem: impl Into<String>) -> Self {
        Self {
            script_stem: script_stem.into(),
            project: HashMap::new(),
            cli: HashMap::new(),
        }
    }

    /// Parses a `key=value,key=value` project option string, as stored
    /// against a namespace's `.project` entry.
    pub fn with_project_options(mut self, raw: &str) -> Self {
        self.project = parse_kv_list(raw);
        self
    }

    pub fn with_cli_args(mut self, args: &[(String, String)]) -> Self {
        self.cli = args.iter().cloned().collect();
        self
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        if let Some(v) = self.cli.get(key) {
            return v.clone();
        }
        let env_key = format!("udp_{}_{}", self.script_stem, key);
        if let Ok(v) = env::var(&env_key) {
            return v;
        }
        if let Some(v) = self.project.get(key) {
            return v.clone();
        }
        default.to_string()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key, if default { "true" } else { "false" }).to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        }
    }
}

fn parse_kv_list(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

//! Backend registration and dispatch
//!
//! This module provides a centralized registry for all flink backends, with
//! support for feature-gated inclusion and dynamic help text generation.

use flink_core::{Flink, FlinkBus};

/// A flink device opened through any backend
pub type FlinkDevice = Flink<Box<dyn FlinkBus + Send>>;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated device with one stepper subdevice (channels=<n>,clock=<hz>,stepping=<steps>)",
    });

    #[cfg(feature = "linux")]
    backends.push(BackendInfo {
        name: "linux",
        aliases: &["flink"],
        description: "Linux flink driver (dev=/dev/flinkN,exclusive=<0|1>)",
    });

    backends
}

/// Generate help text listing all available backends
pub fn backend_help() -> String {
    let backends = available_backends();

    if backends.is_empty() {
        return "No backends available (recompile with backend features enabled)".to_string();
    }

    let mut help = String::from("Available backends:\n");
    for b in &backends {
        help.push_str(&format!("  {:8} - {}\n", b.name, b.description));
    }
    help
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Resolve a backend name or alias to its primary name
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parse a backend string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_backend_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_backend_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown backend: {}\n\n", name);
    msg.push_str(&backend_help());
    msg.push_str("\nUse 'flink list-backends' for more details");
    msg.into()
}

/// Devices opened by this process
///
/// Holds the registry that keeps a device file from being opened twice.
#[derive(Default)]
pub struct Session {
    #[cfg(feature = "linux")]
    registry: flink_linux::DeviceRegistry,
}

impl Session {
    /// Open the device described by a backend string
    #[allow(unused_variables)]
    pub fn open(&self, backend: &str) -> Result<FlinkDevice, Box<dyn std::error::Error>> {
        let (name, options) = parse_backend_string(backend);

        let canonical_name = match find_backend(name) {
            Some(n) => n,
            None => return Err(unknown_backend_error(name)),
        };

        let bus: Box<dyn FlinkBus + Send> = match canonical_name {
            #[cfg(feature = "dummy")]
            "dummy" => {
                let config = flink_dummy::parse_options(&options)
                    .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
                log::info!(
                    "Opening dummy device ({} channels, {} Hz)",
                    config.channels,
                    config.base_clock
                );
                Box::new(flink_dummy::DummyFlink::new(config))
            }

            #[cfg(feature = "linux")]
            "linux" => {
                log::info!("Opening Linux flink device...");
                flink_linux::open_linux_flink(&options, &self.registry).map_err(|e| {
                    format!(
                        "Failed to open flink device: {}\n\
                         Make sure the flink modules are loaded and you have read/write permissions.",
                        e
                    )
                })?
            }

            _ => return Err(unknown_backend_error(name)),
        };

        Ok(Flink::new(bus))
    }
}

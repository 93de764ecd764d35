//! List commands implementation

use crate::backends;
use flink_core::{Flink, FlinkBus};

/// List all available backends
pub fn list_backends() {
    println!("Available backends:");
    println!();

    for b in backends::available_backends() {
        let aliases = if b.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", b.aliases.join(", "))
        };
        println!("  {:8} - {}{}", b.name, b.description, aliases);
    }
}

/// List the subdevices of a flink device
pub fn lsflink<B: FlinkBus>(flink: &mut Flink<B>) -> Result<(), Box<dyn std::error::Error>> {
    let subdevices = flink.subdevices()?;

    println!(
        "{:>3}  {:<21} {:>8}  {:<16} {:>7} {:>7} {:>8}  {:>10}",
        "ID", "Address range", "Size", "Function", "Subtype", "Version", "Channels", "Unique ID"
    );
    println!("{}", "-".repeat(92));

    for sub in &subdevices {
        println!(
            "{:>3}  0x{:08X}-0x{:08X} {:>8}  {:<16} {:>7} {:>7} {:>8}  0x{:08X}",
            sub.id,
            sub.base_addr,
            sub.end_addr(),
            format_size(sub.mem_size),
            sub.function.to_string(),
            sub.subtype,
            sub.version,
            sub.channels,
            sub.unique_id
        );
    }

    println!();
    println!("{} subdevice(s)", subdevices.len());
    Ok(())
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

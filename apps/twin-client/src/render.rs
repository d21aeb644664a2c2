//! Terminal rendering of notifications and the dashboard.

use twin_core::{Notification, StatsTable};

pub fn notification(notification: &Notification) -> String {
    match notification {
        Notification::Log { text, .. } => format!("· {text}"),
        Notification::Chat { text, options, .. } => {
            let mut out = format!("» {text}");
            for (i, option) in options.iter().enumerate() {
                out.push_str(&format!("\n    /{} {}", i + 1, option));
            }
            out
        }
    }
}

pub fn dashboard(table: &StatsTable) -> String {
    let mut out = format!("{:<8} {:>9} {:>8} {:>9}", "WH", "inventory", "inbound", "outbound");
    for (id, row) in table {
        out.push_str(&format!(
            "\n{:<8} {:>9} {:>8} {:>9}",
            id, row.inventory, row.inbound, row.outbound
        ));
    }
    out
}

//! Startup banner

use super::constants::APP_NAME;

/// Whether the bind address listens on every interface
fn is_all_interfaces(host: &str) -> bool {
    host == "0.0.0.0" || host == "::"
}

/// Host shown in URLs (all-interfaces binds display as localhost)
fn display_host(host: &str) -> &str {
    if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    }
}

/// Print the startup banner with endpoint URLs
pub fn print_banner(
    host: &str,
    port: u16,
    legacy_enabled: bool,
    admin_enabled: bool,
    data_dir: &str,
) {
    let base = format!("http://{}:{}", display_host(host), port);
    const W: usize = 10;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}/api/v1/log",
        "Counter:", base
    );
    if admin_enabled {
        println!(
            "  \x1b[35m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}/api/v1/admin",
            "Admin:", base
        );
    }
    println!(
        "  \x1b[90m➜  {:<W$} {}\x1b[0m",
        "Legacy:",
        if legacy_enabled { "backfill on" } else { "off" }
    );
    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);
    println!();
}

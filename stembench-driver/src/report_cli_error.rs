// SPDX-License-Identifier: Apache-2.0

//! Terminal error reporting for the benchmark driver.

use colored::Colorize;

/// Prints `message` to stderr as `stembench-driver: <subcommand>: <message>`,
/// then one indented `key: value` line per detail (for example the config
/// file that failed to load), and exits with status 1.
///
/// Every handler error, including a problem id missing from the problem file
/// or an unknown mutation name, ends up here.
pub fn report_cli_error_and_exit(
    message: &str,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
) -> ! {
    let location = match subcommand {
        Some(subcommand) => format!("{}: ", subcommand),
        None => String::new(),
    };
    eprintln!("stembench-driver: {}{}", location, message.red().bold());
    for (key, value) in details {
        eprintln!("  {}: {}", key.dimmed(), value);
    }
    std::process::exit(1);
}

//! Rendering of resolution results
//!
//! Consumers (provisioning jobs, schedulers, humans) read the outcome of a
//! pass in one of three formats.

use crate::error::ReportError;
use crate::grants::Resolution;
use std::fmt::Write;

/// Output format for a resolution report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// TOML document
    Toml,
    /// One line per grant
    Text,
}

/// Render a resolution in the requested format
pub fn render(resolution: &Resolution, format: OutputFormat) -> Result<String, ReportError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(resolution)?),
        OutputFormat::Toml => Ok(toml::to_string(resolution)?),
        OutputFormat::Text => Ok(render_text(resolution)),
    }
}

fn render_text(resolution: &Resolution) -> String {
    let mut out = String::new();

    for user in &resolution.users {
        for grant in &user.permissions {
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "{} {} {} {}",
                user.login,
                grant.database,
                grant.schemas.join(","),
                grant.effective_grant_class
            );
            if grant.is_downgraded() {
                let _ = write!(out, " (configured: {})", grant.grant_class);
            }
            out.push('\n');
        }
    }

    match resolution.next_transition {
        Some(at) => {
            let _ = writeln!(out, "next transition: {}", at.to_rfc3339());
        }
        None => out.push_str("next transition: never\n"),
    }

    out
}

//! Per-user report command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use checkuser_core::error::AppError;
use checkuser_core::types::UserReport;
use checkuser_server::app;

use crate::output::{self, OutputFormat};

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Users to report on
    #[arg(required = true)]
    pub usernames: Vec<String>,
}

/// Report display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ReportRow {
    /// Username
    username: String,
    /// Active sessions
    connections: u32,
    /// Connection limit
    limit: String,
    /// Expiration date
    expires: String,
    /// Days left
    days: String,
    /// Oldest session age
    online: String,
}

impl From<&UserReport> for ReportRow {
    fn from(report: &UserReport) -> Self {
        Self {
            username: report.username.clone(),
            connections: report.connection_count,
            limit: sentinel(report.connection_limit, "unlimited"),
            expires: report.expiration_date.clone().unwrap_or_else(|| "-".to_string()),
            days: sentinel(report.expiration_days, "-"),
            online: report.time_online.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute the check command
pub async fn execute(
    args: &CheckArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let checker = app::build_checker(&config);

    let mut reports = Vec::with_capacity(args.usernames.len());
    for username in &args.usernames {
        reports.push(checker.report(username).await?);
    }

    match format {
        OutputFormat::Json => output::print_json(&reports),
        OutputFormat::Table => {
            let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn sentinel(value: i64, label: &str) -> String {
    if value < 0 {
        label.to_string()
    } else {
        value.to_string()
    }
}

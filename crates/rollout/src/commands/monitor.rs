use super::{Context, EXIT_PREREQUISITES, health_label};
use colored::Colorize;
use rollout::PrerequisiteChecker;
use rollout::monitor::{Severity, check_all};
use rollout_platform_fly::FlyPlatform;

pub async fn handle(ctx: Context) -> anyhow::Result<i32> {
    let checker = PrerequisiteChecker::new(
        ctx.settings.required_credentials.clone(),
        ctx.settings.required_tools.clone(),
    );
    if !super::check_prerequisites(&checker) {
        return Ok(EXIT_PREREQUISITES);
    }

    let platform = FlyPlatform::from_env();
    let summary = check_all(&platform, &ctx.registry).await;

    println!("{} {}", "Health:".bold(), ctx.registry.name.cyan());
    for entry in &summary.entries {
        let machines = match entry.snapshot.machine_count {
            Some(total) => format!("{}/{} running", entry.snapshot.started_count, total),
            None => "unknown".to_string(),
        };
        println!(
            "  {:<24} {:<12} {}",
            entry.name.cyan(),
            health_label(entry.health),
            machines.dimmed()
        );
    }

    let percent = summary.percentage();
    let line = format!(
        "{}/{} healthy ({}%)",
        summary.healthy(),
        summary.entries.len(),
        percent
    );
    let severity = summary.severity();
    match severity {
        Severity::Ok => println!("{}", line.green().bold()),
        Severity::Warning => println!("{}", line.yellow().bold()),
        Severity::Critical => println!("{}", line.red().bold()),
    }

    Ok(severity.exit_code())
}

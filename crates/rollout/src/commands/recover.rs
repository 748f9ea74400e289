use super::{Context, EXIT_FAILED, EXIT_OK, EXIT_PREREQUISITES, RunFailed, print_summary};
use anyhow::Context as _;
use chrono::Utc;
use colored::Colorize;
use rollout::report::commit_hash;
use rollout::{PrerequisiteChecker, RecoveryAgent, ReportGenerator, ReportKind, RunLog};
use rollout_platform_fly::FlyPlatform;
use uuid::Uuid;

pub async fn handle(ctx: Context) -> anyhow::Result<i32> {
    println!(
        "{} {} ({} services)",
        "Recovering".blue().bold(),
        ctx.registry.name.cyan(),
        ctx.registry.len()
    );

    // Recovery may redeploy, so it needs the same tools as a deploy run
    let checker = PrerequisiteChecker::for_run(&ctx.settings, &ctx.registry);
    if !super::check_prerequisites(&checker) {
        return Ok(EXIT_PREREQUISITES);
    }

    let run_id = Uuid::new_v4();
    let runs_dir = ctx.runs_dir();
    let run_log = RunLog::create(&runs_dir, &run_id.to_string())
        .with_context(|| format!("cannot create run log in {}", runs_dir.display()))
        .map_err(RunFailed)?;
    run_log.banner(&format!("recovery run {} for {}", run_id, ctx.registry.name));

    let started_at = Utc::now();
    let platform = FlyPlatform::from_env();
    let records = RecoveryAgent::new(&platform, &ctx.settings, &ctx.root, &run_log)
        .sweep(&ctx.registry)
        .await;

    let commit = commit_hash(&ctx.root).await;
    let report = ReportGenerator::new(&platform, ctx.settings.log_tail_lines)
        .generate(
            run_id,
            ReportKind::Recovery,
            commit,
            started_at,
            &ctx.registry,
            records,
        )
        .await;

    print_summary(&report);
    super::persist_report(&report, &runs_dir).await;

    Ok(if report.all_ok() { EXIT_OK } else { EXIT_FAILED })
}

use super::{Context, EXIT_FAILED, EXIT_OK};
use colored::Colorize;
use rollout_build::validate_service;

pub async fn handle(ctx: Context) -> anyhow::Result<i32> {
    println!("{}", "Validating registry...".blue());
    println!(
        "Registry: {} ({})",
        ctx.registry.name.cyan(),
        ctx.registry_path.display()
    );

    let mut failed = 0;
    for (i, service) in ctx.registry.iter().enumerate() {
        let regions: Vec<&str> = service.regions().map(|r| r.as_str()).collect();
        let workdir = ctx.root.join(&service.path);

        match validate_service(service, &workdir) {
            Ok(()) => {
                println!(
                    "  {} {}. {} [{}]",
                    "✓".green(),
                    i + 1,
                    service.name.cyan(),
                    regions.join(", ")
                );
            }
            Err(errors) => {
                failed += 1;
                println!(
                    "  {} {}. {} [{}]",
                    "✗".red(),
                    i + 1,
                    service.name.cyan(),
                    regions.join(", ")
                );
                for error in errors {
                    println!("      {}", error);
                }
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{}", "✓ All services are valid".green().bold());
        Ok(EXIT_OK)
    } else {
        println!(
            "{}",
            format!("✗ {} of {} services failed validation", failed, ctx.registry.len())
                .red()
                .bold()
        );
        Ok(EXIT_FAILED)
    }
}

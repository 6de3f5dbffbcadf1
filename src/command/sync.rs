use log::error;

use crate::cli::SyncArgs;
use crate::config::{Config, TargetConfig};
use crate::ctx::Ctx;
use crate::error::{fail, Attempt, Maybe};
use crate::reconcile::{reconcile, FetchTarget};

fn select_targets<'a>(config: &'a Config, names: &[String]) -> Maybe<Vec<&'a TargetConfig>> {
    if names.is_empty() {
        return Ok(config.targets.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            config
                .target(name)
                .ok_or_else(|| anyhow::anyhow!("no target named {name} in config"))
        })
        .collect()
}

pub fn sync_command(ctx: &Ctx, args: &SyncArgs) -> Attempt {
    let policy = ctx.config.policy();
    let targets = select_targets(&ctx.config, &args.names)?;

    let mut failures = 0;
    for target in targets {
        let source = target.source();
        let fetch_target = FetchTarget {
            name: &target.name,
            local_path: &target.path,
            source: source.as_ref(),
        };
        match reconcile(&fetch_target, &policy) {
            Ok(result) => {
                println!("{}: {} ({})", target.name, result.action, result.reason);
            }
            Err(e) => {
                if !args.keep_going {
                    return Err(e.into());
                }
                error!("{e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return fail(&format!("{failures} target(s) failed"));
    }
    Ok(())
}

use crate::cli::StatusArgs;
use crate::ctx::Ctx;
use crate::error::{fail, Attempt};
use crate::reconcile::classify;

struct Styles {
    pub highlight: &'static str,
    pub muted: &'static str,
    pub end: &'static str,
}

fn get_styles(ctx: &Ctx) -> Styles {
    if ctx.color_enabled() {
        Styles {
            highlight: "\x1b[1;37m",
            muted: "\x1b[1;94m",
            end: "\x1b[0m",
        }
    } else {
        Styles {
            highlight: "",
            muted: "",
            end: "",
        }
    }
}

pub fn status_command(ctx: &Ctx, args: &StatusArgs) -> Attempt {
    let styles = get_styles(ctx);

    for target in &ctx.config.targets {
        if let Some(name) = &args.name {
            if name != &target.name {
                continue;
            }
        }
        let source = target.source();
        let (action, reason) = classify(&target.path, source.identity());
        println!(
            "{}{}{} would {}{action}{} ({reason})",
            styles.highlight,
            target.name,
            styles.end,
            styles.muted,
            styles.end,
        );
    }

    if let Some(name) = &args.name {
        if ctx.config.target(name).is_none() {
            return fail(&format!("no target named {name} in config"));
        }
    }
    Ok(())
}

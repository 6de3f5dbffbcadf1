use crate::cli::PullArgs;
use crate::ctx::Ctx;
use crate::error::Attempt;
use crate::preserve::sync_preserving_local_edits;
use crate::worktree::GitWorkTree;

pub fn pull_command(ctx: &Ctx, args: &PullArgs) -> Attempt {
    let mut tree = GitWorkTree::open(&args.path)?;
    let report = sync_preserving_local_edits(&mut tree, &ctx.config.policy())?;

    if report.stashed {
        println!(
            "{}: pulled latest, local edits stashed and restored",
            args.path.display()
        );
    } else {
        println!("{}: pulled latest, no local edits", args.path.display());
    }
    Ok(())
}

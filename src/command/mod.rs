use std::env;
use std::io::{stdout, IsTerminal};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::ctx::{Ctx, Mode};
use crate::error::{fail, Attempt};

use self::init::init_command;
use self::pull::pull_command;
use self::status::status_command;
use self::sync::sync_command;

mod init;
mod pull;
mod status;
mod sync;

pub fn run_command(cli: &Cli) -> Attempt {
    if let Commands::Init = cli.command {
        return init_command(&cli.config);
    }

    let config = Config::load(&cli.config)?;
    let mut ctx = Ctx::new(config);
    ctx.set_mode(if stdout().lock().is_terminal() {
        Mode::Cli
    } else {
        Mode::Pipe
    });
    if env::var_os("NO_COLOR").is_some() {
        ctx.disable_color();
    }

    match &cli.command {
        Commands::Init => fail("unexpected command after block"),
        Commands::Sync(args) => sync_command(&ctx, args),
        Commands::Status(args) => status_command(&ctx, args),
        Commands::Pull(args) => pull_command(&ctx, args),
    }
}

use crate::config::Config;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Cli,
    Pipe,
}

pub struct Ctx {
    pub config: Config,
    mode: Mode,
    color: bool,
}

impl Ctx {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            mode: Mode::Pipe,
            color: true,
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn disable_color(&mut self) {
        self.color = false;
    }

    pub fn color_enabled(&self) -> bool {
        self.color && self.mode == Mode::Cli
    }
}

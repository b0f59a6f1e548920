#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    /// Stage progress note, shown only with --verbose. Goes to stderr so
    /// stdout stays reserved for the run summary.
    pub fn note(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }
}

/// Resolve the configured color mode (`auto`/`always`/`never`) against
/// the `--no-color` flag and the terminal.
pub fn resolve_color(setting: &str, no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    match setting {
        "always" => true,
        "never" => false,
        _ => detect_color(true),
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty_stdout()
}

fn atty_stdout() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}

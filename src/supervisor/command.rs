// src/supervisor/command.rs

//! Worker command line.
//!
//! ```text
//! <worker> --background --factory-startup --enable-autoexec [extra..] [<working-file>] --python <entry-script> --
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

pub const HEADLESS_FLAGS: [&str; 3] = ["--background", "--factory-startup", "--enable-autoexec"];

#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    extra_args: Vec<String>,
    working_file: Option<PathBuf>,
    entry_script: PathBuf,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, entry_script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            working_file: None,
            entry_script: entry_script.into(),
        }
    }

    pub fn extra_args(mut self, args: &[String]) -> Self {
        self.extra_args.extend(args.iter().cloned());
        self
    }

    pub fn working_file(mut self, path: Option<&Path>) -> Self {
        self.working_file = path.map(Path::to_path_buf);
        self
    }

    /// Arguments after the program name, in order.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = HEADLESS_FLAGS.iter().map(OsString::from).collect();
        args.extend(self.extra_args.iter().map(OsString::from));
        if let Some(file) = &self.working_file {
            args.push(file.as_os_str().to_owned());
        }
        args.push(OsString::from("--python"));
        args.push(self.entry_script.as_os_str().to_owned());
        args.push(OsString::from("--"));
        args
    }

    /// Build the process command. The parent environment is inherited.
    pub fn into_command(self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args()).current_dir(cwd);
        cmd
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args().iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

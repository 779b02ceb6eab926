//! Argument vectors for the capture utilities.

use std::ffi::OsString;
use std::path::Path;

/// What to run inside the recorded terminal.
///
/// `None` lets the utility start the user's interactive shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureCommand {
    command: Option<Vec<String>>,
}

impl CaptureCommand {
    pub fn new(command: Option<&[String]>) -> Self {
        let command = command.filter(|c| !c.is_empty()).map(|c| c.to_vec());
        Self { command }
    }

    pub fn shell() -> Self {
        Self::default()
    }

    pub fn is_shell(&self) -> bool {
        self.command.is_none()
    }

    /// The command as one string for `sh -c`, each argument quoted.
    pub fn shell_string(&self) -> Option<String> {
        let command = self.command.as_ref()?;
        let escaped: Vec<String> = command
            .iter()
            .map(|arg| {
                shlex::try_quote(arg)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| format!("'{}'", arg.replace('\'', "'\\''")))
            })
            .collect();
        Some(escaped.join(" "))
    }

    /// `script [-c <cmd>] -q -t <script-file>`; timing goes to stderr.
    pub fn script_args(&self, script_file: &Path) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(cmd) = self.shell_string() {
            args.push(OsString::from("-c"));
            args.push(OsString::from(cmd));
        }
        args.push(OsString::from("-q"));
        args.push(OsString::from("-t"));
        args.push(script_file.as_os_str().to_owned());
        args
    }

    /// `ttyrec [-e <cmd>] <script-file>`
    pub fn ttyrec_args(&self, script_file: &Path) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(cmd) = self.shell_string() {
            args.push(OsString::from("-e"));
            args.push(OsString::from(cmd));
        }
        args.push(script_file.as_os_str().to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_shell_when_no_command() {
        let cmd = CaptureCommand::new(None);
        assert!(cmd.is_shell());
        assert_eq!(
            strings(cmd.script_args(Path::new("/tmp/s"))),
            vec!["-q", "-t", "/tmp/s"]
        );
        assert_eq!(strings(cmd.ttyrec_args(Path::new("/tmp/s"))), vec!["/tmp/s"]);
    }

    #[test]
    fn test_empty_command_means_shell() {
        let empty: Vec<String> = Vec::new();
        assert!(CaptureCommand::new(Some(empty.as_slice())).is_shell());
    }

    #[test]
    fn test_command_is_quoted_into_one_argument() {
        let argv = vec!["grep".to_string(), "two words".to_string(), "it's".to_string()];
        let cmd = CaptureCommand::new(Some(argv.as_slice()));
        let shell = cmd.shell_string().unwrap();

        assert_eq!(shlex::split(&shell).unwrap(), argv);
        assert_eq!(
            strings(cmd.script_args(Path::new("out"))),
            vec!["-c".to_string(), shell.clone(), "-q".into(), "-t".into(), "out".into()]
        );
        assert_eq!(
            strings(cmd.ttyrec_args(Path::new("out"))),
            vec!["-e".to_string(), shell, "out".into()]
        );
    }

    #[test]
    fn test_simple_command_is_unquoted() {
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let cmd = CaptureCommand::new(Some(argv.as_slice()));
        assert_eq!(cmd.shell_string().as_deref(), Some("echo hello"));
    }
}

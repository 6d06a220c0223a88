//! Host clipboard and open capabilities
//!
//! The server does not touch the clipboard itself; it hands every request to a
//! [`HostService`]. [`SystemHost`] shells out to the platform's own tools.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::common::{Error, Result};

/// Clipboard and open operations on the host machine
///
/// Calls block until the external program exits.
pub trait HostService: Send + Sync {
    /// Replace the clipboard contents with `text`
    fn copy(&self, text: &str) -> Result<()>;

    /// Read the clipboard contents
    fn paste(&self) -> Result<Vec<u8>>;

    /// Open a URL or file with the default handler
    fn open(&self, target: &str) -> Result<()>;
}

/// Operating systems we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Unsupported(&'static str),
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &'static str) -> Self {
        match os {
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Unsupported(other),
        }
    }

    fn copy_command(self) -> Result<(&'static str, Vec<String>)> {
        match self {
            Platform::MacOs => Ok(("pbcopy", vec![])),
            Platform::Linux => Ok(("xclip", args(["-selection", "clipboard"]))),
            Platform::Unsupported(os) => Err(Error::UnsupportedPlatform(os.to_string())),
        }
    }

    fn paste_command(self) -> Result<(&'static str, Vec<String>)> {
        match self {
            Platform::MacOs => Ok(("pbpaste", vec![])),
            Platform::Linux => Ok(("xclip", args(["-selection", "clipboard", "-o"]))),
            Platform::Unsupported(os) => Err(Error::UnsupportedPlatform(os.to_string())),
        }
    }

    fn open_command(self, target: &str) -> Result<(&'static str, Vec<String>)> {
        match self {
            Platform::MacOs => Ok(("open", args([target]))),
            Platform::Linux => Ok(("xdg-open", args([target]))),
            Platform::Unsupported(os) => Err(Error::UnsupportedPlatform(os.to_string())),
        }
    }
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// [`HostService`] backed by the platform's clipboard and opener programs
#[derive(Debug, Clone, Copy)]
pub struct SystemHost {
    platform: Platform,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::for_platform(Platform::current())
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostService for SystemHost {
    fn copy(&self, text: &str) -> Result<()> {
        let (program, args) = self.platform.copy_command()?;
        run("copy", program, &args, Some(text.as_bytes()), false).map(|_| ())
    }

    fn paste(&self) -> Result<Vec<u8>> {
        let (program, args) = self.platform.paste_command()?;
        run("paste", program, &args, None, true)
    }

    fn open(&self, target: &str) -> Result<()> {
        let (program, args) = self.platform.open_command(target)?;
        run("open", program, &args, None, false).map(|_| ())
    }
}

/// Run `program` to completion
///
/// stdout is only captured when `capture` is set: `xclip` and `xdg-open` may
/// leave a background child holding inherited pipes open.
fn run(
    op: &'static str,
    program: &str,
    args: &[String],
    input: Option<&[u8]>,
    capture: bool,
) -> Result<Vec<u8>> {
    let path = which::which(program)
        .map_err(|_| Error::capability(op, format!("{} not found in PATH", program)))?;

    tracing::debug!(op, program = %path.display(), "Running host command");

    let mut child = Command::new(&path)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if capture { Stdio::piped() } else { Stdio::null() })
        .stderr(if capture { Stdio::piped() } else { Stdio::null() })
        .spawn()
        .map_err(|e| Error::capability(op, e.to_string()))?;

    if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin
            .write_all(data)
            .map_err(|e| Error::capability(op, e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| Error::capability(op, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => output.status.to_string(),
            detail => format!("{}: {}", output.status, detail),
        };
        return Err(Error::capability(op, message));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Unsupported("windows"));
    }

    #[test]
    fn test_linux_commands() {
        let (program, args) = Platform::Linux.paste_command().unwrap();
        assert_eq!(program, "xclip");
        assert_eq!(args, ["-selection", "clipboard", "-o"]);

        let (program, args) = Platform::Linux.open_command("https://example.com").unwrap();
        assert_eq!(program, "xdg-open");
        assert_eq!(args, ["https://example.com"]);
    }

    #[test]
    fn test_macos_commands() {
        let (program, args) = Platform::MacOs.copy_command().unwrap();
        assert_eq!(program, "pbcopy");
        assert!(args.is_empty());
    }

    #[test]
    fn test_unsupported_platform_fails_every_operation() {
        let host = SystemHost::for_platform(Platform::Unsupported("plan9"));

        for result in [
            host.copy("text").map(|_| Vec::new()),
            host.paste(),
            host.open("https://example.com").map(|_| Vec::new()),
        ] {
            match result {
                Err(Error::UnsupportedPlatform(os)) => assert_eq!(os, "plan9"),
                other => panic!("Expected UnsupportedPlatform, got {:?}", other),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_names_operation() {
        let err = run("copy", "gh-rdm-no-such-program", &[], Some(&b"x"[..]), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "copy failed: gh-rdm-no-such-program not found in PATH"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output_and_failure() {
        let out = run("paste", "sh", &args(["-c", "printf 'a\\nb'"]), None, true).unwrap();
        assert_eq!(out, b"a\nb");

        let err = run("paste", "sh", &args(["-c", "echo nope >&2; exit 3"]), None, true)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("paste failed: "), "{}", message);
        assert!(message.contains("nope"), "{}", message);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_feeds_stdin() {
        let out = run("copy", "sh", &args(["-c", "cat"]), Some(&b"line\n"[..]), true).unwrap();
        assert_eq!(out, b"line\n");
    }
}

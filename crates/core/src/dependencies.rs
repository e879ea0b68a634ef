//! External tool configuration and presence checks.
//!
//! The converter (`yt-dlp`) and `ffmpeg` are both required. Each is
//! configured as a [`ToolCommand`]: a program plus optional leading
//! arguments, so deployments can run e.g. `python3 -m yt_dlp`.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::CoreError;

/// Reported name of the converter tool.
pub const YT_DLP: &str = "yt-dlp";
/// Reported name of the audio toolchain.
pub const FFMPEG: &str = "ffmpeg";

/// Message returned when a conversion is requested without the tools present.
pub const MISSING_DEPENDENCIES_MESSAGE: &str =
    "Server is missing required dependencies. Install yt-dlp and ffmpeg to continue.";

// ---------------------------------------------------------------------------
// ToolCommand
// ---------------------------------------------------------------------------

/// A program plus the leading arguments that precede any per-call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    prefix_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<String>, prefix_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            prefix_args: prefix_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a shell-style command line such as `python3 -m yt_dlp`.
    pub fn parse(command_line: &str) -> Result<Self, CoreError> {
        let mut words = shell_words::split(command_line)
            .map_err(|e| CoreError::Validation(format!("Invalid command '{command_line}': {e}")))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| CoreError::Validation("Command must not be empty".to_string()))?;
        Ok(Self {
            program,
            prefix_args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn prefix_args(&self) -> &[String] {
        &self.prefix_args
    }

    /// A fresh [`Command`] with the program and prefix arguments applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args);
        cmd
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut words = vec![self.program.as_str()];
        words.extend(self.prefix_args.iter().map(String::as_str));
        f.write_str(&shell_words::join(words))
    }
}

// ---------------------------------------------------------------------------
// Toolchain
// ---------------------------------------------------------------------------

/// The pair of external tools a conversion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub converter: ToolCommand,
    pub ffmpeg: ToolCommand,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            converter: ToolCommand::new(YT_DLP),
            ffmpeg: ToolCommand::new(FFMPEG),
        }
    }
}

/// Presence of each required tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyReport {
    pub yt_dlp: bool,
    pub ffmpeg: bool,
}

impl DependencyReport {
    pub fn ok(&self) -> bool {
        self.yt_dlp && self.ffmpeg
    }

    /// Names of the tools that were not detected, in a fixed order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.yt_dlp {
            missing.push(YT_DLP);
        }
        if !self.ffmpeg {
            missing.push(FFMPEG);
        }
        missing
    }

    /// `Ok(())` when every tool is present, otherwise a dependency error.
    pub fn require_all(&self) -> Result<(), CoreError> {
        if self.ok() {
            Ok(())
        } else {
            Err(CoreError::DependencyMissing(
                MISSING_DEPENDENCIES_MESSAGE.to_string(),
            ))
        }
    }
}

/// Probe both tools concurrently.
pub async fn check(toolchain: &Toolchain) -> DependencyReport {
    let (yt_dlp, ffmpeg) = tokio::join!(
        probe(&toolchain.converter, "--version"),
        probe(&toolchain.ffmpeg, "-version"),
    );
    let report = DependencyReport { yt_dlp, ffmpeg };
    if !report.ok() {
        tracing::warn!(missing = ?report.missing(), "Required external tools not detected");
    }
    report
}

/// Run `tool <version_flag>` with all output discarded; present means it
/// spawned and exited zero.
pub async fn probe(tool: &ToolCommand, version_flag: &str) -> bool {
    let status = tool
        .command()
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::debug!(tool = %tool, error = %e, "Tool probe failed to spawn");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_splits_program_and_prefix() {
        let tool = ToolCommand::parse("python3 -m yt_dlp").unwrap();
        assert_eq!(tool.program(), "python3");
        assert_eq!(tool.prefix_args(), ["-m", "yt_dlp"]);
    }

    #[test]
    fn parse_honours_quotes() {
        let tool = ToolCommand::parse("'/opt/my tools/yt-dlp'").unwrap();
        assert_eq!(tool.program(), "/opt/my tools/yt-dlp");
        assert!(tool.prefix_args().is_empty());
    }

    #[test]
    fn parse_rejects_empty_and_unbalanced() {
        assert_matches!(ToolCommand::parse("   "), Err(CoreError::Validation(_)));
        assert_matches!(ToolCommand::parse("\"unterminated"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let tool = ToolCommand::with_args("/opt/my tools/run", ["-m", "yt_dlp"]);
        assert_eq!(ToolCommand::parse(&tool.to_string()).unwrap(), tool);
    }

    #[test]
    fn report_lists_missing_in_order() {
        let report = DependencyReport {
            yt_dlp: false,
            ffmpeg: false,
        };
        assert!(!report.ok());
        assert_eq!(report.missing(), vec![YT_DLP, FFMPEG]);

        let report = DependencyReport {
            yt_dlp: true,
            ffmpeg: false,
        };
        assert_eq!(report.missing(), vec![FFMPEG]);
        assert_matches!(report.require_all(), Err(CoreError::DependencyMissing(_)));

        let report = DependencyReport {
            yt_dlp: true,
            ffmpeg: true,
        };
        assert!(report.missing().is_empty());
        assert!(report.require_all().is_ok());
    }

    #[tokio::test]
    async fn probe_detects_present_and_absent_tools() {
        assert!(probe(&ToolCommand::new("true"), "--version").await);
        assert!(!probe(&ToolCommand::new("false"), "--version").await);
        assert!(!probe(&ToolCommand::new("/nonexistent/tool"), "--version").await);
    }

    #[tokio::test]
    async fn check_reports_exactly_the_missing_tool() {
        let toolchain = Toolchain {
            converter: ToolCommand::new("true"),
            ffmpeg: ToolCommand::new("/nonexistent/ffmpeg"),
        };
        let report = check(&toolchain).await;
        assert!(report.yt_dlp);
        assert!(!report.ffmpeg);
        assert_eq!(report.missing(), vec![FFMPEG]);
    }
}

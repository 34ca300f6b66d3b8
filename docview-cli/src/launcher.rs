use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use docview_core::{PrintJob, ProcessLauncher};
use tracing::{debug, info};
use url::Url;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "file"];

/// Hands URIs to `xdg-open` and print jobs to CUPS. Arguments are passed as
/// argv entries, never through a shell.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn open_uri(&self, uri: &str) -> Result<()> {
        let url = validate_uri(uri)?;
        info!(%url, "opening link");
        Command::new("xdg-open")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to launch xdg-open")?;
        Ok(())
    }

    fn print(&self, job: &PrintJob) -> Result<()> {
        info!(printer = %job.printer, pages = %job.pages, "printing");
        let status = Command::new("lp")
            .args(print_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .context("failed to launch lp")?;
        if !status.success() {
            bail!("lp exited with {status}");
        }
        Ok(())
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        let output = Command::new("lpstat")
            .arg("-e")
            .stdin(Stdio::null())
            .output()
            .context("failed to launch lpstat")?;
        if !output.status.success() {
            debug!(status = %output.status, "lpstat failed");
            return Ok(Vec::new());
        }
        Ok(parse_printers(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn validate_uri(uri: &str) -> Result<Url> {
    let url = Url::parse(uri).with_context(|| format!("invalid link target {uri:?}"))?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(anyhow!("refusing to open {} link", url.scheme()));
    }
    Ok(url)
}

fn print_args(job: &PrintJob) -> Vec<String> {
    vec![
        "-d".to_string(),
        job.printer.clone(),
        "-P".to_string(),
        job.pages.clone(),
        job.path.display().to_string(),
    ]
}

fn parse_printers(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_known_schemes_are_opened() {
        assert!(validate_uri("https://example.org/a?b=c").is_ok());
        assert!(validate_uri("mailto:someone@example.org").is_ok());
        assert!(validate_uri("file:///tmp/a.pdf").is_ok());
        assert!(validate_uri("javascript:alert(1)").is_err());
        assert!(validate_uri("not a url").is_err());
    }

    #[test]
    fn print_arguments_are_separate_entries() {
        let job = PrintJob::new(
            "office; rm -rf /",
            Some("2-3"),
            PathBuf::from("/tmp/my file.pdf"),
            5,
        );
        assert_eq!(
            print_args(&job),
            vec!["-d", "office; rm -rf /", "-P", "2-3", "/tmp/my file.pdf"]
        );
    }

    #[test]
    fn printer_list_skips_blank_lines() {
        assert_eq!(
            parse_printers("office\n\n  lab \n"),
            vec!["office".to_string(), "lab".to_string()]
        );
    }
}

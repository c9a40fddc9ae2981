use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::application::services::manifest_service::{ManifestFormat, ManifestService};
use crate::domain::entities::manifest::Manifest;

/// Handler for the dump-manifest command
pub struct DumpManifestCommand {
    /// Defaults to the format of the loaded manifest file
    pub output_format: Option<OutputFormat>,
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for ManifestFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => ManifestFormat::Yaml,
            OutputFormat::Json => ManifestFormat::Json,
        }
    }
}

impl DumpManifestCommand {
    pub fn new(output_format: Option<OutputFormat>, output_file: Option<PathBuf>, verbose: bool) -> Self {
        Self {
            output_format,
            output_file,
            verbose,
        }
    }

    /// Re-serialize `manifest` with every default written out.
    pub fn render(&self, manifest: &Manifest, manifest_path: &Path) -> Result<String> {
        let format = self
            .output_format
            .map(ManifestFormat::from)
            .unwrap_or_else(|| ManifestFormat::from_path(manifest_path));

        ManifestService::new()
            .serialize(manifest, format)
            .context("Failed to serialize manifest")
    }

    pub async fn execute(&self, manifest: &Manifest, manifest_path: &Path) -> Result<()> {
        let output_content = self.render(manifest, manifest_path)?;

        match &self.output_file {
            Some(file_path) => {
                tokio::fs::write(file_path, &output_content)
                    .await
                    .with_context(|| format!("Failed to write {}", file_path.display()))?;
                println!(
                    "{} Manifest dumped to: {}",
                    "✓".green().bold(),
                    file_path.display().to_string().bold()
                );

                if self.verbose {
                    println!("  File size: {} bytes", output_content.len());
                }
            }
            None => {
                print!("{}", output_content);
                if !output_content.ends_with('\n') {
                    println!();
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::manifest_service::ManifestFormat;

    fn manifest() -> Manifest {
        ManifestService::new()
            .parse_from_str(
                "remotes:\n  origin:\n    fetch: \"https://example.com/%s.git\"\nprojects:\n  alpha: {}\n",
                ManifestFormat::Yaml,
            )
            .unwrap()
    }

    #[test]
    fn test_format_follows_manifest_extension() {
        let command = DumpManifestCommand::new(None, None, false);
        let json = command
            .render(&manifest(), Path::new("/ws/manifest.json"))
            .unwrap();
        assert!(json.trim_start().starts_with('{'));

        let yaml = command
            .render(&manifest(), Path::new("/ws/manifest.yml"))
            .unwrap();
        assert!(yaml.contains("default-revision: master"));
    }

    #[test]
    fn test_explicit_format_wins() {
        let command = DumpManifestCommand::new(Some(OutputFormat::Json), None, false);
        let json = command
            .render(&manifest(), Path::new("/ws/manifest.yml"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["projects"]["alpha"]["from-remote"], "origin");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}

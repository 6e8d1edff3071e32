use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the cheat-triage scanner.
#[derive(Parser, Debug)]
#[clap(name = "cheat-triage", about = "Host-based cheat-software triage scanner")]
pub struct Args {
    /// Path to a scan configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Output directory for reports (default: %TEMP%/cheat-triage or /tmp/cheat-triage)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Run only the named probes (comma-separated, e.g. "prefetch,bam")
    #[clap(short = 'p', long)]
    pub probes: Option<String>,

    /// Print the JSON report to stdout instead of writing files
    #[clap(long)]
    pub json: bool,

    /// List available probes and exit
    #[clap(long)]
    pub list_probes: bool,

    /// Write a default configuration file to the given path and exit
    #[clap(long)]
    pub init_config: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parsed probe filter, if one was given.
    pub fn probe_filter(&self) -> Option<Vec<String>> {
        self.probes.as_ref().map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_filter_parsing() {
        let args = Args::parse_from(["cheat-triage", "--probes", "prefetch, bam,,dns"]);
        assert_eq!(
            args.probe_filter(),
            Some(vec![
                "prefetch".to_string(),
                "bam".to_string(),
                "dns".to_string()
            ])
        );
    }

    #[test]
    fn test_no_probe_filter() {
        let args = Args::parse_from(["cheat-triage"]);
        assert_eq!(args.probe_filter(), None);
    }
}

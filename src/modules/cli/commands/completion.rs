//! Hidden command to generate shell completions.

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

/// Generate shell completion scripts.
///
/// Hidden from `--help`; used by packaging scripts.
#[derive(Args, Debug)]
pub struct CompletionCommand {
    /// Shell to generate completions for (e.g. bash, zsh)
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionCommand {
    pub fn execute(&self, out: &mut dyn std::io::Write) {
        let mut cmd = crate::Cli::command();
        generate(self.shell, &mut cmd, "sqlwrap", out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completion_mentions_subcommands() {
        let mut buf = Vec::new();
        CompletionCommand { shell: Shell::Bash }.execute(&mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("sqlwrap"));
        assert!(script.contains("resolve"));
    }
}

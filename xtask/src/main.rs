use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for prism")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and doc in sequence
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates, warnings denied
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Print one headless frame of the demo scene
    Trace,
    /// Launch the desktop demo
    Demo {
        /// Build with optimizations
        #[arg(long)]
        release: bool,
    },
}

/// A named cargo invocation.
struct Step {
    name: &'static str,
    args: &'static [&'static str],
}

const FMT: Step = Step {
    name: "fmt",
    args: &["fmt", "--all", "--", "--check"],
};
const CLIPPY: Step = Step {
    name: "clippy",
    args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
};
const TEST: Step = Step {
    name: "test",
    args: &["test", "--workspace"],
};
const DOC: Step = Step {
    name: "doc",
    args: &["doc", "--workspace", "--no-deps"],
};
const BUILD: Step = Step {
    name: "build",
    args: &["build", "--workspace"],
};
const TRACE: Step = Step {
    name: "trace",
    args: &["run", "-p", "prism-cli", "--", "trace"],
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            for step in [FMT, CLIPPY, TEST, DOC] {
                cargo(&step)?;
            }
        }
        Commands::Fmt => cargo(&FMT)?,
        Commands::Clippy => cargo(&CLIPPY)?,
        Commands::Test => cargo(&TEST)?,
        Commands::Doc => cargo(&DOC)?,
        Commands::Build => cargo(&BUILD)?,
        Commands::Trace => cargo(&TRACE)?,
        Commands::Demo { release } => {
            let step = if release {
                Step {
                    name: "demo",
                    args: &["run", "--release", "-p", "prism-desktop"],
                }
            } else {
                Step {
                    name: "demo",
                    args: &["run", "-p", "prism-desktop"],
                }
            };
            cargo(&step)?;
        }
    }

    Ok(())
}

fn cargo(step: &Step) -> Result<()> {
    println!("==> cargo {}", step.args.join(" "));
    let status = Command::new("cargo").args(step.args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", step.name);
    }
    Ok(())
}

//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use juliac::util::shell::ColorChoice;

/// juliac - Compile Julia programs into native artifacts
#[derive(Parser)]
#[command(name = "juliac")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (echo every command)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a Julia program into an object file, shared library or executable
    Build(BuildArgs),

    /// Check that Julia and a C compiler are usable
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Julia program to compile
    pub program: PathBuf,

    /// C driver program for the executable (a bundled driver is used if omitted)
    pub driver: Option<PathBuf>,

    /// Build directory, relative to the program unless absolute
    #[arg(short = 'd', long)]
    pub build_dir: Option<PathBuf>,

    /// Start up with the given system image file
    #[arg(short = 'J', long)]
    pub sysimage: Option<PathBuf>,

    /// Enable or disable JIT compiler: yes, no, all, min
    #[arg(long)]
    pub compile: Option<String>,

    /// Limit usage of CPU features up to the given target
    #[arg(short = 'C', long)]
    pub cpu_target: Option<String>,

    /// Set the optimization level: 0, 1, 2, 3
    #[arg(short = 'O', long)]
    pub optimize: Option<String>,

    /// Set the debugging information level: 0, 1, 2
    #[arg(short = 'g', long)]
    pub debug: Option<String>,

    /// Control whether inlining is permitted: yes, no
    #[arg(long)]
    pub inline: Option<String>,

    /// Emit bounds checks always or never: yes, no
    #[arg(long)]
    pub check_bounds: Option<String>,

    /// Set floating point optimizations: ieee, fast
    #[arg(long)]
    pub math_mode: Option<String>,

    /// Enable or disable syntax and method deprecation warnings: yes, no, error
    #[arg(long)]
    pub depwarn: Option<String>,

    /// Automatically enable the stages a requested stage depends on
    #[arg(short = 'a', long)]
    pub autodeps: bool,

    /// Build an object file
    #[arg(short = 'o', long)]
    pub object: bool,

    /// Build a shared library
    #[arg(short = 's', long)]
    pub shared: bool,

    /// Build an executable
    #[arg(short = 'e', long)]
    pub executable: bool,

    /// Copy the runtime's shared libraries into the build directory
    #[arg(short = 'j', long)]
    pub sync_libs: bool,

    /// Delete the build directory first
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// Print the commands that would run, without running any stage
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct DoctorArgs {}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

//! Man page generator for mbedgtw
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
#[path = "../cli.rs"]
mod cli;

fn render(cmd: clap::Command, title: &str, output_path: &Path) -> std::io::Result<()> {
    let man = clap_mangen::Man::new(cmd).title(title);
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(output_path, buffer)
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Default to ./man directory
    let output_dir = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("man")
    };

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let output_path = output_dir.join("mbedgtw.1");
    render(cmd.clone(), "mbedgtw", &output_path)?;

    // One page per subcommand: mbedgtw-run-tests.1, ...
    for sub in cmd.get_subcommands() {
        let name = format!("mbedgtw-{}", sub.get_name());
        render(sub.clone(), &name, &output_dir.join(format!("{}.1", name)))?;
    }

    println!("Man pages generated in: {}", output_dir.display());
    println!("\nTo view the man page:");
    println!("  man -l {}", output_path.display());

    Ok(())
}

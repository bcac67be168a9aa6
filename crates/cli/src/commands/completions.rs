//! `medchat completions`: shell completion scripts.

use clap_complete::{Shell, generate};

pub fn run(shell: Shell, command: &mut clap::Command) {
    let name = command.get_name().to_string();
    generate(shell, command, name, &mut std::io::stdout());
}

pub mod command;
pub mod parse;

use crate::{
    cli::Cli,
    shell::{
        command::{execute_command, report_error, Command, Session},
        parse::parse_command,
    },
};
use bfs::{Geometry, Result};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{io::stdout, path::PathBuf};

const COMMANDS: [&str; 16] = [
    "help", "ls", "df", "create", "open", "close", "read", "write", "seek", "tell", "size",
    "stat", "cat", "rm", "format", "exit",
];

pub fn start_shell(cli: Cli) -> Result<()> {
    let geometry = Geometry::new(cli.block_size, cli.blocks);
    let mut session = Session::boot(cli.disk, geometry, cli.format)?;
    welcome_banner(&session);

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bfs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("history disabled: {}", e),
    }

    // 命令补全
    let completer = DefaultCompleter::new_with_wordlen(
        COMMANDS.iter().map(|c| c.to_string()).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!("{}@{}:bfs", username, hostname)),
        DefaultPromptSegment::Basic(session.disk_path.display().to_string()),
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut session) {
                            report_error(&e);
                        }
                        if matches!(cmd, Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown or malformed command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting BFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}

fn welcome_banner(session: &Session) {
    let sb = session.fs.super_block();
    let usage = session.fs.usage();
    let mut stdout = stdout();

    let banner = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to BFS v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    );
    if let Err(e) = banner {
        log::debug!("terminal does not support the banner: {}", e);
    }

    println!(
        "{} {} {} ({} x {} bytes, {} of {} data blocks free)",
        "💽 Volume".bright_black(),
        session.fs.disk().path().display(),
        sb.volume_id,
        sb.geometry.block_count,
        sb.geometry.block_size,
        usage.free_blocks,
        usage.data_blocks
    );
}

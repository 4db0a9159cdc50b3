use bfs::{Fd, Whence};

use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];
    let fd = || args.first()?.parse::<usize>().ok().map(Fd);

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls),
        "df" => Some(Command::Df),
        "create" => args.first().map(|&name| Command::Create(name.to_string())),
        "open" => args.first().map(|&name| Command::Open(name.to_string())),
        "close" => fd().map(Command::Close),
        "read" => Some(Command::Read(fd()?, args.get(1)?.parse().ok()?)),
        "write" => {
            if args.len() >= 2 {
                Some(Command::Write(fd()?, args[1..].join(" ")))
            } else {
                None
            }
        }
        "seek" => {
            let offset = args.get(1)?.parse().ok()?;
            let whence = match args.get(2) {
                Some(w) => w.parse::<Whence>().ok()?,
                None => Whence::Set,
            };
            Some(Command::Seek(fd()?, offset, whence))
        }
        "tell" => fd().map(Command::Tell),
        "size" => fd().map(Command::Size),
        "stat" => args.first().map(|&name| Command::Stat(name.to_string())),
        "cat" => args.first().map(|&name| Command::Cat(name.to_string())),
        "rm" => args.first().map(|&name| Command::Rm(name.to_string())),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bfs::{
    utils::format_timestamp, FileDisk, FileSystem, Fd, FsError, Geometry, Result, Whence,
};

#[derive(Debug)]
pub enum Command {
    Help,
    Ls,
    Df,
    Create(String),
    Open(String),
    Close(Fd),
    Read(Fd, usize),
    Write(Fd, String),
    Seek(Fd, i64, Whence),
    Tell(Fd),
    Size(Fd),
    Stat(String),
    Cat(String),
    Rm(String),
    Format,
    Exit,
}

/// What the shell operates on: the mounted volume and where it came from.
pub struct Session {
    pub fs: FileSystem<FileDisk>,
    pub disk_path: PathBuf,
    pub geometry: Geometry,
}

impl Session {
    /// Mounts the image, formatting it first when asked to or when it does not exist yet.
    pub fn boot(disk_path: PathBuf, geometry: Geometry, force_format: bool) -> Result<Self> {
        let fs = if force_format || !disk_path.exists() {
            println!(
                "{} {}",
                "🔧 Formatting new volume at".yellow(),
                disk_path.display()
            );
            format_volume(&disk_path, geometry)?
        } else {
            FileSystem::mount(FileDisk::open(&disk_path)?)?
        };

        Ok(Self {
            fs,
            disk_path,
            geometry,
        })
    }
}

fn format_volume(path: &Path, geometry: Geometry) -> Result<FileSystem<FileDisk>> {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message("💾 Writing superblock, inodes, directory and free list...");

    let result = FileDisk::create(path, geometry.block_size, geometry.block_count)
        .and_then(|disk| FileSystem::format(disk, geometry));

    match &result {
        Ok(_) => pb.finish_with_message("✅ Disk formatted successfully!"),
        Err(_) => pb.abandon_with_message("❌ Format failed"),
    }
    result
}

pub fn execute_command(cmd: &Command, session: &mut Session) -> Result<()> {
    let fs = &mut session.fs;
    match cmd {
        Command::Help => print_help(),
        Command::Ls => {
            let files = fs.list()?;
            if files.is_empty() {
                println!("{}", "(empty)".bright_black());
            }
            for file in files {
                println!("📄  {:<16} {:>8} bytes", file.name, file.size);
            }
        }
        Command::Df => {
            let usage = fs.usage();
            println!(
                "{}: {}/{} free\n{}: {}/{} free\n{}: {}/{} open",
                "Blocks".blue(),
                usage.free_blocks,
                usage.data_blocks,
                "Inodes".blue(),
                usage.free_inodes,
                usage.inodes,
                "Descriptors".blue(),
                usage.open_files,
                usage.open_file_limit
            );
        }
        Command::Create(name) => {
            let fd = fs.create(name)?;
            println!("📝 Created {} on fd {}", name.green(), fd.to_string().cyan());
        }
        Command::Open(name) => {
            let fd = fs.open(name)?;
            println!("📂 Opened {} on fd {}", name.green(), fd.to_string().cyan());
        }
        Command::Close(fd) => {
            fs.close(*fd)?;
            println!("🔒 Closed fd {}", fd);
        }
        Command::Read(fd, count) => {
            let mut buf = vec![0u8; *count];
            let n = fs.read(*fd, &mut buf)?;
            println!("{}", String::from_utf8_lossy(&buf[..n]));
            println!("{}", format!("({} of {} bytes)", n, count).bright_black());
        }
        Command::Write(fd, content) => {
            let n = fs.write(*fd, content.as_bytes())?;
            println!("✏️  Wrote {} bytes to fd {}", n.to_string().green(), fd);
        }
        Command::Seek(fd, offset, whence) => {
            let cursor = fs.seek(*fd, *offset, *whence)?;
            println!("📍 fd {} cursor at {}", fd, cursor.to_string().cyan());
        }
        Command::Tell(fd) => println!("📍 {}", fs.tell(*fd)?),
        Command::Size(fd) => println!("📏 {} bytes", fs.size(*fd)?),
        Command::Stat(name) => {
            let stat = fs.stat(name)?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {}\n",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                stat.name,
                "Inode".blue(),
                stat.inode,
                "Size".blue(),
                stat.size,
                "Blocks".blue(),
                stat.blocks,
                "Modified".blue(),
                format_timestamp(stat.modified)
            );
        }
        Command::Cat(name) => {
            let fd = fs.open(name)?;
            let mut content = vec![0u8; fs.size(fd)? as usize];
            let read = fs.read(fd, &mut content);
            fs.close(fd)?;
            let n = read?;
            println!("{}", String::from_utf8_lossy(&content[..n]));
        }
        Command::Rm(name) => {
            fs.remove(name)?;
            println!("❌ Deleted file: {}", name.red());
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Erase {} and format a new volume?",
                    session.disk_path.display()
                ))
                .default(false)
                .interact()
                .unwrap_or(false);
            if confirmed {
                session.fs = format_volume(&session.disk_path, session.geometry)?;
            } else {
                println!("{}", "Format cancelled.".bright_black());
            }
        }
        Command::Exit => println!("{}", "👋 Exiting BFS shell...".yellow().bold()),
    }

    Ok(())
}

/// Prints an error tagged with its class.
pub fn report_error(e: &FsError) {
    if e.is_fatal() {
        println!("{} {}", "❌ Fatal:".red().bold(), e);
    } else {
        println!("{} {}", "⚠️ ".yellow(), e);
    }
}

fn print_help() {
    println!("{}", "📘 BFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls                       List files
  df                       Show free blocks and inodes
  create <file>            Create (or truncate) a file and open it
  open <file>              Open a file, prints its descriptor
  close <fd>               Close a descriptor
  read <fd> <n>            Read up to n bytes at the cursor
  write <fd> <text>        Write text at the cursor
  seek <fd> <off> [whence] Move the cursor (whence: set, cur, end)
  tell <fd>                Show the cursor
  size <fd>                Show the file size
  stat <file>              Show file info
  cat <file>               Print a whole file
  rm <file>                Delete a file
  format                   Format the disk image
  help                     Show this help message
  exit                     Quit the shell
"
        .bright_black()
    );
}

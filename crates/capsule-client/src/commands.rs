//! Line-oriented command surface used by the `capsule` binary.

use std::path::PathBuf;
use std::sync::Arc;

use capsule_shared::elapsed::{format_elapsed, relationship_start};
use capsule_shared::models::{note_number, Image};
use capsule_shared::IdentityId;
use chrono::{DateTime, Local, Utc};
use futures::future::{BoxFuture, FutureExt};

use crate::download::Downloader;
use crate::focus::{Card, View};
use crate::gallery::UploadFile;
use crate::session::Capsule;
use crate::sync::ContentSync;

pub const HELP: &str = "\
Commands:
  unlock <secret>     open the capsule
  lock                back to the gate
  status              presence of both of you
  expand me|partner   show activities for one card
  collapse            collapse the expanded card
  menu                open or close the view menu
  since               time since the start
  go home|voicemails|gallery
  posts               list posts
  post <text>         write a post
  voicemails          list voice notes
  record              start or stop a voice note
  folders             list folders
  folder <name>       create a folder
  open <n>            open folder n
  close               close the open folder
  images              list images in the open folder
  upload <path>       add an image to the open folder
  show <n>            select image n
  download            save the selected image
  refresh             re-fetch everything
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Unlock(String),
    Lock,
    Status,
    Expand(Card),
    Collapse,
    Menu,
    Since,
    Go(View),
    Posts,
    Post(String),
    Voicemails,
    Record,
    Folders,
    Folder(String),
    Open(usize),
    Close,
    Images,
    Upload(PathBuf),
    Show(usize),
    Download,
    Refresh,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let index = |what: &str| {
            rest.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Usage: {what} <number>"))
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" | "help" | "?" => Self::Help,
            "unlock" => Self::Unlock(rest.to_string()),
            "lock" => Self::Lock,
            "status" => Self::Status,
            "expand" => match rest {
                "me" => Self::Expand(Card::Me),
                "partner" => Self::Expand(Card::Partner),
                _ => return Err("Usage: expand me|partner".into()),
            },
            "collapse" => Self::Collapse,
            "menu" => Self::Menu,
            "since" => Self::Since,
            "go" => Self::Go(View::parse(rest).ok_or("Usage: go home|voicemails|gallery")?),
            "posts" => Self::Posts,
            "post" => Self::Post(rest.to_string()),
            "voicemails" => Self::Voicemails,
            "record" => Self::Record,
            "folders" => Self::Folders,
            "folder" => Self::Folder(rest.to_string()),
            "open" => Self::Open(index("open")?),
            "close" => Self::Close,
            "images" => Self::Images,
            "upload" if !rest.is_empty() => Self::Upload(PathBuf::from(rest)),
            "upload" => return Err("Usage: upload <path>".into()),
            "show" => Self::Show(index("show")?),
            "download" => Self::Download,
            "refresh" => Self::Refresh,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command: {other}")),
        };
        Ok(command)
    }
}

/// Run one command and return the text to show.
pub async fn execute(capsule: &mut Capsule, command: Command) -> String {
    match command {
        Command::Help => return HELP.to_string(),
        Command::Quit => return String::new(),
        Command::Unlock(attempt) => {
            return if capsule.unlock(&attempt).await {
                "Welcome back.".to_string()
            } else {
                "Wrong secret.".to_string()
            };
        }
        _ if !capsule.is_unlocked() => return "Locked. Use `unlock <secret>`.".to_string(),
        _ => {}
    }

    let sync = capsule.sync().clone();
    match command {
        Command::Lock => {
            capsule.lock().await;
            "Locked.".to_string()
        }
        Command::Status => status(capsule).await,
        Command::Expand(card) => {
            capsule.focus_mut().toggle_card(card);
            status(capsule).await
        }
        Command::Collapse => {
            capsule.focus_mut().collapse_cards();
            status(capsule).await
        }
        Command::Menu => {
            let open = !capsule.focus().menu_open();
            capsule.focus_mut().set_menu_open(open);
            if open {
                menu(capsule.focus().view())
            } else {
                "Menu closed.".to_string()
            }
        }
        Command::Since => match relationship_start() {
            Some(start) => format_elapsed(start, Utc::now()),
            None => "Start date unavailable.".to_string(),
        },
        Command::Go(view) => {
            capsule.navigate(view).await;
            format!("Now in {}.", view.label())
        }
        Command::Posts => {
            let posts = sync.posts().await;
            if posts.is_empty() {
                return "No posts yet.".to_string();
            }
            posts
                .iter()
                .map(|p| format!("[{}] {}", local_time(p.created_at), p.text))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Post(text) => reply(sync.create_post(&text).await, "Posted."),
        Command::Voicemails => {
            let voicemails = sync.voicemails().await;
            if voicemails.is_empty() {
                return "No voice notes yet.".to_string();
            }
            let total = voicemails.len();
            voicemails
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    format!(
                        "Note {}  {}  {}",
                        note_number(total, i),
                        local_time(v.created_at),
                        v.url
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Record => match capsule.toggle_recording().await {
            Ok(true) => "Recording... `record` again to stop.".to_string(),
            Ok(false) => "Saving voice note...".to_string(),
            Err(e) => format!("Could not record: {e}"),
        },
        Command::Folders => {
            let folders = sync.folders().await;
            if folders.is_empty() {
                return "No folders yet.".to_string();
            }
            folders
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{:>3}. {}", i + 1, f.name))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Folder(name) => reply(sync.create_folder(&name).await, "Folder created."),
        Command::Open(n) => {
            let Some(folder) = sync.folders().await.into_iter().nth(n - 1) else {
                return format!("No folder {n}.");
            };
            let name = folder.name.clone();
            match capsule.open_folder(folder).await {
                Ok(()) => format!("Opened {name}."),
                Err(e) => format!("Opened {name}, but images could not be loaded: {e}"),
            }
        }
        Command::Close => {
            capsule.close_folder().await;
            "Closed.".to_string()
        }
        Command::Images => {
            let Some(folder) = sync.current_folder().await else {
                return "No folder is open.".to_string();
            };
            let images = sync.folder_images().await;
            if images.is_empty() {
                return format!("{} is empty.", folder.name);
            }
            images
                .iter()
                .enumerate()
                .map(|(i, img)| format!("{:>3}. {}", i + 1, img.url))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Upload(path) => upload(sync, path).await,
        Command::Show(n) => match sync.folder_images().await.into_iter().nth(n - 1) {
            Some(image) => {
                let url = image.url.clone();
                capsule.focus_mut().select_image(image);
                format!("Selected {url}")
            }
            None => format!("No image {n}."),
        },
        Command::Download => {
            let Some(image) = capsule.focus().selected_image().cloned() else {
                return "Select an image with `show <n>` first.".to_string();
            };
            download(capsule.downloader().clone(), image).await
        }
        Command::Refresh => {
            let report = sync.refresh_all().await;
            if report.is_complete() {
                "Up to date.".to_string()
            } else {
                format!("Some collections failed to load: {:?}", report.failed)
            }
        }
        Command::Help | Command::Quit | Command::Unlock(_) => String::new(),
    }
}

/// Transfers that should run without holding up the next command.
/// Returns `None` for everything else, including commands that cannot
/// start yet (locked, nothing selected); run those through [`execute`].
pub fn detach(capsule: &Capsule, command: &Command) -> Option<BoxFuture<'static, String>> {
    if !capsule.is_unlocked() {
        return None;
    }
    match command {
        Command::Upload(path) => Some(upload(capsule.sync().clone(), path.clone()).boxed()),
        Command::Download => {
            let image = capsule.focus().selected_image().cloned()?;
            Some(download(capsule.downloader().clone(), image).boxed())
        }
        _ => None,
    }
}

async fn upload(sync: Arc<ContentSync>, path: PathBuf) -> String {
    match UploadFile::from_path(&path).await {
        Ok(file) => reply(sync.upload_image(file).await, "Uploaded."),
        Err(e) => format!("Could not read {}: {e}", path.display()),
    }
}

async fn download(downloader: Downloader, image: Image) -> String {
    let name = image.download_name();
    match downloader.download(&image.url, Some(&name)).await {
        Ok(path) => format!("Saved to {}", path.display()),
        Err(e) => format!("Download failed: {e}"),
    }
}

fn menu(current: View) -> String {
    View::ALL
        .iter()
        .map(|v| {
            let marker = if *v == current { "*" } else { " " };
            format!("{marker} {}", v.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn reply<E: std::fmt::Display>(result: Result<(), E>, ok: &str) -> String {
    match result {
        Ok(()) => ok.to_string(),
        Err(e) => format!("Failed: {e}"),
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

async fn status(capsule: &Capsule) -> String {
    let board = capsule.presence();
    let identities = capsule.identities().clone();
    let max_age = chrono::Duration::from_std(capsule.config().poll_interval * 3)
        .unwrap_or_else(|_| chrono::Duration::minutes(1));
    let expanded = capsule.focus().expanded();

    let mut lines = Vec::new();
    for (card, label, identity) in [
        (Card::Me, "You", &identities.me),
        (Card::Partner, "Partner", &identities.partner),
    ] {
        lines.push(card_line(label, identity, &board, max_age).await);
        if expanded == Some(card) {
            lines.extend(card_details(identity, &board).await);
        }
    }
    lines.join("\n")
}

async fn card_line(
    label: &str,
    identity: &IdentityId,
    board: &capsule_presence::PresenceBoard,
    max_age: chrono::Duration,
) -> String {
    let Some(entry) = board.get(identity).await else {
        return format!("{label}: waiting for presence...");
    };
    let snapshot = &entry.snapshot;
    let name = snapshot.display_name().unwrap_or(identity.as_str());
    let stale = if entry.is_stale(Utc::now(), max_age) {
        " (stale)"
    } else {
        ""
    };
    format!(
        "{label}: {name} [{}] {}{stale}",
        snapshot.status(),
        snapshot.summary()
    )
}

async fn card_details(identity: &IdentityId, board: &capsule_presence::PresenceBoard) -> Vec<String> {
    let Some(entry) = board.get(identity).await else {
        return Vec::new();
    };
    let snapshot = entry.snapshot;
    let mut lines: Vec<String> = snapshot
        .display_activities()
        .into_iter()
        .map(|a| {
            let detail = [a.details.as_deref(), a.state.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" / ");
            if detail.is_empty() {
                format!("    {}", a.name)
            } else {
                format!("    {}: {detail}", a.name)
            }
        })
        .collect();
    if let Some(track) = &snapshot.spotify {
        lines.push(format!("    Listening to {} by {}", track.song, track.artist));
    }
    if let Some(avatar) = snapshot.avatar_url(identity) {
        lines.push(format!("    {avatar}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("post hello there").unwrap(), Command::Post("hello there".into()));
        assert_eq!(Command::parse("open 2").unwrap(), Command::Open(2));
        assert_eq!(Command::parse("GO Gallery").unwrap(), Command::Go(View::Gallery));
        assert_eq!(Command::parse("").unwrap(), Command::Help);
        assert!(Command::parse("open 0").is_err());
        assert!(Command::parse("upload").is_err());
        assert!(Command::parse("dance").is_err());
        assert_eq!(Command::parse("menu").unwrap(), Command::Menu);
        assert_eq!(Command::parse("collapse").unwrap(), Command::Collapse);
    }

    #[test]
    fn test_menu_marks_current_view() {
        assert_eq!(menu(View::Voicemails), "  Home\n* Voicemails\n  Gallery");
    }
}
